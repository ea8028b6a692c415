// src/crawl/barrier.rs
// =============================================================================
// LevelBarrier: waits for every task of one breadth-first level.
//
// It is a counter of "parties" that still have work to do:
// - The orchestrator holds one party (the sentinel) while it dispatches
// - Every download registers a party before it is submitted
// - A successful download registers one more party for its extraction
//   BEFORE giving up its own, so the count can't touch zero in between
//
// Parties are RAII guards: dropping a Party deregisters it. That way a task
// that panics, or a queued task that is dropped on shutdown, still lets the
// level finish.
//
// Registration is allowed while the orchestrator is already waiting. Once
// the count reaches zero it stays there, since only a live party can
// register another one.
// =============================================================================

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{watch, Notify};

use super::error::CrawlError;

pub struct LevelBarrier {
    depth: usize,
    parties: Mutex<usize>,
    advanced: Notify,
}

impl LevelBarrier {
    // Creates the barrier for one level, together with the orchestrator's
    // sentinel party
    pub fn new(depth: usize) -> (Arc<Self>, Party) {
        let barrier = Arc::new(Self {
            depth,
            parties: Mutex::new(1),
            advanced: Notify::new(),
        });
        let sentinel = Party {
            barrier: Arc::clone(&barrier),
        };
        (barrier, sentinel)
    }

    pub fn register(self: &Arc<Self>) -> Party {
        *self.parties.lock() += 1;
        Party {
            barrier: Arc::clone(self),
        }
    }

    pub fn outstanding(&self) -> usize {
        *self.parties.lock()
    }

    fn arrive_and_deregister(&self) {
        let remaining = {
            let mut parties = self.parties.lock();
            *parties -= 1;
            *parties
        };
        if remaining == 0 {
            // notify_one keeps a permit if nobody is waiting yet
            self.advanced.notify_one();
        }
    }

    // Gives up the sentinel and waits until every other party is gone.
    //
    // Fails with CrawlError::Interrupted if `shutdown` flips to true (or its
    // sender goes away) first.
    pub async fn await_advance(
        &self,
        sentinel: Party,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), CrawlError> {
        sentinel.arrive();

        loop {
            // Shutdown drops and aborts tasks, which also empties the
            // barrier, so it has to be checked first
            if *shutdown.borrow_and_update() {
                return Err(CrawlError::Interrupted { depth: self.depth });
            }
            if self.outstanding() == 0 {
                return Ok(());
            }

            tokio::select! {
                _ = self.advanced.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Err(CrawlError::Interrupted { depth: self.depth });
                    }
                }
            }
        }
    }
}

// One registered unit of work. Deregisters on drop.
pub struct Party {
    barrier: Arc<LevelBarrier>,
}

impl Party {
    pub fn arrive(self) {
        drop(self);
    }
}

impl Drop for Party {
    fn drop(&mut self) {
        self.barrier.arrive_and_deregister();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn running() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn test_empty_level_advances_immediately() {
        let (_tx, rx) = running();
        let (barrier, sentinel) = LevelBarrier::new(0);
        barrier.await_advance(sentinel, rx).await.unwrap();
        assert_eq!(barrier.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_waits_for_every_party() {
        let (_tx, rx) = running();
        let (barrier, sentinel) = LevelBarrier::new(0);
        let first = barrier.register();
        let second = barrier.register();
        assert_eq!(barrier.outstanding(), 3);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            first.arrive();
            tokio::time::sleep(Duration::from_millis(10)).await;
            second.arrive();
        });

        barrier.await_advance(sentinel, rx).await.unwrap();
        assert_eq!(barrier.outstanding(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_party_can_register_while_orchestrator_waits() {
        let (_tx, rx) = running();
        let (barrier, sentinel) = LevelBarrier::new(1);
        let download = barrier.register();

        let spawner = Arc::clone(&barrier);
        let extraction_done = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&extraction_done);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            // The download hands its work on before it deregisters itself
            let extraction = spawner.register();
            download.arrive();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                *flag.lock() = true;
                extraction.arrive();
            });
        });

        barrier.await_advance(sentinel, rx).await.unwrap();
        assert!(*extraction_done.lock());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_wait() {
        let (tx, rx) = running();
        let (barrier, sentinel) = LevelBarrier::new(3);
        let _stuck = barrier.register();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = tx.send(true);
        });

        let err = barrier.await_advance(sentinel, rx).await.unwrap_err();
        assert!(matches!(err, CrawlError::Interrupted { depth: 3 }));
    }

    #[tokio::test]
    async fn test_shutdown_wins_over_emptied_level() {
        let (tx, rx) = running();
        let (barrier, sentinel) = LevelBarrier::new(2);
        let dropped = barrier.register();

        let _ = tx.send(true);
        dropped.arrive();

        let err = barrier.await_advance(sentinel, rx).await.unwrap_err();
        assert!(matches!(err, CrawlError::Interrupted { depth: 2 }));
    }
}
