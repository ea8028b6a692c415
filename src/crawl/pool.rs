// src/crawl/pool.rs
// =============================================================================
// A fixed-size pool of worker tasks.
//
// The crawler owns two of these: one for downloads, one for link extraction.
// Each worker runs ONE job at a time, so the pool size is exactly the number
// of jobs that can be in progress at once.
//
// How it works:
// 1. Jobs are boxed futures sent over an unbounded channel
// 2. Every worker loops: take the receiver lock, wait for a job, run it
// 3. A panicking job is caught and logged; the worker keeps going
// 4. shutdown() aborts every worker immediately (no draining)
//
// Submitting never blocks, so a job can safely submit more jobs (a download
// submitting its extraction, a finished download handing its host slot on).
// =============================================================================

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type Job = BoxFuture<'static, ()>;

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>;

pub struct WorkerPool {
    name: &'static str,
    sender: mpsc::UnboundedSender<Job>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl WorkerPool {
    // Starts `size` workers on the current tokio runtime
    pub fn new(name: &'static str, size: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..size)
            .map(|id| tokio::spawn(worker_loop(name, id, Arc::clone(&receiver))))
            .collect();

        debug!(pool = name, size, "worker pool started");

        Self {
            name,
            sender,
            workers: Mutex::new(workers),
            closed: AtomicBool::new(false),
        }
    }

    // Queues a job for the next free worker.
    //
    // Hands the job back if the pool has been shut down; dropping it is up
    // to the caller.
    pub fn submit(&self, job: Job) -> Result<(), Job> {
        if self.closed.load(Ordering::Acquire) {
            return Err(job);
        }
        self.sender.send(job).map_err(|e| {
            // Every worker is gone; treat the pool as shut down from now on
            self.closed.store(true, Ordering::Release);
            e.0
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // Aborts every worker. Jobs that are running are cancelled at their next
    // await point, queued jobs are dropped without running.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for worker in &workers {
            worker.abort();
        }
        debug!(pool = self.name, workers = workers.len(), "worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn worker_loop(pool: &'static str, id: usize, receiver: SharedReceiver) {
    loop {
        // Only the idle worker holding the lock waits on the channel
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            warn!(pool, worker = id, "job panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_runs_submitted_jobs() {
        let pool = WorkerPool::new("test", 2);
        let counter = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = oneshot::channel();
        let done_tx = Arc::new(Mutex::new(Some(done_tx)));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            let done_tx = Arc::clone(&done_tx);
            let job: Job = Box::pin(async move {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 == 10 {
                    if let Some(tx) = done_tx.lock().take() {
                        let _ = tx.send(());
                    }
                }
            });
            assert!(pool.submit(job).is_ok());
        }

        done_rx.await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_size_bounds_parallelism() {
        let pool = WorkerPool::new("test", 3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for _ in 0..12 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let tx = tx.clone();
            let job: Job = Box::pin(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                let _ = tx.send(());
            });
            assert!(pool.submit(job).is_ok());
        }

        for _ in 0..12 {
            rx.recv().await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_worker_survives_panicking_job() {
        let pool = WorkerPool::new("test", 1);
        let panicking: Job = Box::pin(async { panic!("boom") });
        assert!(pool.submit(panicking).is_ok());

        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = tx.send(42);
        });
        assert!(pool.submit(job).is_ok());
        assert_eq!(rx.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let pool = WorkerPool::new("test", 2);
        pool.shutdown();
        assert!(pool.is_closed());
        let job: Job = Box::pin(async {});
        assert!(pool.submit(job).is_err());
    }

    #[tokio::test]
    async fn test_pool_without_workers_closes_on_first_rejection() {
        let pool = WorkerPool::new("test", 0);
        assert!(!pool.is_closed());
        let job: Job = Box::pin(async {});
        assert!(pool.submit(job).is_err());
        assert!(pool.is_closed());
    }
}
