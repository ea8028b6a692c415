// src/crawl/host_queue.rs
// =============================================================================
// Per-host admission control.
//
// Every host gets a HostAdmissionQueue with two pieces of state:
// - active: how many of its downloads are sitting in the download pool
// - pending: downloads waiting for one of those slots to free up
//
// submit() either hands the task to the download pool right away or parks it
// in `pending`. When a running download finishes, it drops its HostSlot,
// which calls release(): the next pending task takes over the slot, or the
// slot is given back. Nobody ever blocks waiting for a slot, and distinct
// hosts never share a lock.
//
// Invariant: active <= per_host, and a task is either pending or admitted,
// never both.
// =============================================================================

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

use super::pool::{Job, WorkerPool};

// A download waiting for admission. It receives the slot it runs under and
// must keep it alive until the download is finished.
pub type HostTask = Box<dyn FnOnce(HostSlot) -> Job + Send>;

struct HostState {
    active: usize,
    pending: VecDeque<HostTask>,
}

pub struct HostAdmissionQueue {
    host: String,
    per_host: usize,
    pool: Arc<WorkerPool>,
    state: Mutex<HostState>,
}

impl HostAdmissionQueue {
    fn new(host: String, per_host: usize, pool: Arc<WorkerPool>) -> Self {
        Self {
            host,
            per_host,
            pool,
            state: Mutex::new(HostState {
                active: 0,
                pending: VecDeque::new(),
            }),
        }
    }

    pub fn submit(self: &Arc<Self>, task: HostTask) {
        let admitted = {
            let mut state = self.state.lock();
            if state.active < self.per_host {
                state.active += 1;
                Some(task)
            } else {
                state.pending.push_back(task);
                trace!(host = %self.host, pending = state.pending.len(), "download queued behind host limit");
                None
            }
        };

        // Dispatch happens outside the lock: if the pool is closed the job is
        // dropped here, and dropping it re-enters release()
        if let Some(task) = admitted {
            self.dispatch(task);
        }
    }

    // Called once per admitted task, when it is done (or dropped)
    fn release(self: &Arc<Self>) {
        let (next, abandoned) = {
            let mut state = self.state.lock();
            if self.pool.is_closed() {
                // Nothing will run again: give the slot back and empty the
                // queue in one go. The tasks never got a slot, so dropping
                // them can't come back into release()
                state.active -= 1;
                (None, state.pending.drain(..).collect::<Vec<_>>())
            } else {
                match state.pending.pop_front() {
                    // Slot passes straight to the next task, active is unchanged
                    Some(task) => (Some(task), Vec::new()),
                    None => {
                        state.active -= 1;
                        (None, Vec::new())
                    }
                }
            }
        };

        if !abandoned.is_empty() {
            trace!(host = %self.host, tasks = abandoned.len(), "download pool closed, dropping queued tasks");
        }
        drop(abandoned);

        if let Some(task) = next {
            self.dispatch(task);
        }
    }

    fn dispatch(self: &Arc<Self>, task: HostTask) {
        let job = task(HostSlot {
            queue: Arc::clone(self),
        });
        // A rejected job releases its slot on drop. The pool is closed by
        // then, so that release drains the queue instead of dispatching again
        if let Err(job) = self.pool.submit(job) {
            trace!(host = %self.host, "download pool closed, dropping task");
            drop(job);
        }
    }

    fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.active == 0 && state.pending.is_empty()
    }

    // Drops every pending task without running it.
    fn abandon_pending(&self) {
        let pending: Vec<_> = self.state.lock().pending.drain(..).collect();
        drop(pending);
    }

    #[cfg(test)]
    pub fn active(&self) -> usize {
        self.state.lock().active
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }
}

// Proof that a task holds one of its host's slots. Dropping it releases the
// slot, whether the task finished, panicked or never ran.
pub struct HostSlot {
    queue: Arc<HostAdmissionQueue>,
}

impl HostSlot {
    pub fn host(&self) -> &str {
        &self.queue.host
    }
}

impl Drop for HostSlot {
    fn drop(&mut self) {
        self.queue.release();
    }
}

// The table of host queues, created lazily per host and shared by every
// crawl that runs on the same crawler.
pub struct HostTable {
    per_host: usize,
    pool: Arc<WorkerPool>,
    hosts: DashMap<String, Arc<HostAdmissionQueue>>,
}

impl HostTable {
    pub fn new(per_host: usize, pool: Arc<WorkerPool>) -> Self {
        Self {
            per_host,
            pool,
            hosts: DashMap::new(),
        }
    }

    pub fn queue(&self, host: &str) -> Arc<HostAdmissionQueue> {
        // Fast path: no write lock on the shard when the host is known
        if let Some(queue) = self.hosts.get(host) {
            return Arc::clone(queue.value());
        }
        let entry = self.hosts.entry(host.to_string()).or_insert_with(|| {
            Arc::new(HostAdmissionQueue::new(
                host.to_string(),
                self.per_host,
                Arc::clone(&self.pool),
            ))
        });
        Arc::clone(entry.value())
    }

    pub fn submit(&self, host: &str, task: HostTask) {
        // Clone the Arc out first so no shard lock is held while dispatching
        let queue = self.queue(host);
        queue.submit(task);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    // Drops the queues of hosts nobody is using. A queue that is idle and
    // only referenced by the table can't be picked up concurrently, since
    // lookups go through the shard lock that retain() holds.
    pub fn prune_idle(&self) {
        self.hosts
            .retain(|_, queue| !(Arc::strong_count(queue) == 1 && queue.is_idle()));
    }

    // Forgets every host, dropping the tasks still waiting for a slot.
    // Only used on shutdown, after the pool has stopped.
    pub fn clear(&self) {
        let queues: Vec<_> = self
            .hosts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        self.hosts.clear();
        for queue in queues {
            queue.abandon_pending();
        }
    }
}
