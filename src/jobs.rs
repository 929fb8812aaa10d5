//! Uniquely-keyed release jobs
//!
//! The sweeper (and anything else that wants a hold released out-of-band)
//! enqueues by hold id; the key `release_hold_{id}` collapses duplicate
//! dispatches while a job is queued or running. A single background worker
//! drains the queue, retrying transient failures.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::CheckoutConfig;
use crate::hold::HoldManager;

pub fn job_key(hold_id: i64) -> String {
    format!("release_hold_{hold_id}")
}

/// Enqueue side. Cheap to clone; shared by the sweeper and the gateway state.
#[derive(Clone)]
pub struct ReleaseQueue {
    sender: mpsc::UnboundedSender<i64>,
    inflight: Arc<DashMap<String, ()>>,
}

/// Dequeue side; runs on its own task.
pub struct ReleaseWorker {
    receiver: mpsc::UnboundedReceiver<i64>,
    inflight: Arc<DashMap<String, ()>>,
    holds: HoldManager,
    cfg: CheckoutConfig,
}

/// Build the connected queue/worker pair.
pub fn release_channel(holds: HoldManager, cfg: CheckoutConfig) -> (ReleaseQueue, ReleaseWorker) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let inflight = Arc::new(DashMap::new());

    let queue = ReleaseQueue {
        sender,
        inflight: inflight.clone(),
    };
    let worker = ReleaseWorker {
        receiver,
        inflight,
        holds,
        cfg,
    };
    (queue, worker)
}

impl ReleaseQueue {
    /// Schedule a release job. Returns false when an identical job is already
    /// queued or running (the duplicate collapses).
    pub fn enqueue(&self, hold_id: i64) -> bool {
        use dashmap::mapref::entry::Entry;

        match self.inflight.entry(job_key(hold_id)) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(());
                if self.sender.send(hold_id).is_err() {
                    // Worker is gone; drop the claim so a restart can retry.
                    self.inflight.remove(&job_key(hold_id));
                    error!(hold_id, "release worker unavailable, job dropped");
                    return false;
                }
                true
            }
        }
    }
}

impl ReleaseWorker {
    pub async fn run(mut self) {
        debug!("release worker started");
        while let Some(hold_id) = self.receiver.recv().await {
            self.process(hold_id).await;
            self.inflight.remove(&job_key(hold_id));
        }
        debug!("release queue closed, worker exiting");
    }

    async fn process(&self, hold_id: i64) {
        for attempt in 1..=self.cfg.release_job_tries {
            let outcome = tokio::time::timeout(
                self.cfg.release_job_timeout(),
                self.holds.release_hold(hold_id),
            )
            .await;

            match outcome {
                Ok(Ok(released)) => {
                    debug!(hold_id, released, "release job finished");
                    return;
                }
                Ok(Err(e)) => {
                    warn!(hold_id, attempt, error = %e, "release job failed");
                }
                Err(_) => {
                    warn!(hold_id, attempt, "release job timed out");
                }
            }

            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        }
        error!(
            hold_id,
            tries = self.cfg.release_job_tries,
            "release job exhausted retries; sweeper will redispatch"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_key_format() {
        assert_eq!(job_key(42), "release_hold_42");
    }

    // Queue-only tests: build the enqueue side directly, no worker/DB needed.
    fn bare_queue() -> (ReleaseQueue, mpsc::UnboundedReceiver<i64>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            ReleaseQueue {
                sender,
                inflight: Arc::new(DashMap::new()),
            },
            receiver,
        )
    }

    #[test]
    fn test_duplicate_enqueue_collapses() {
        let (queue, mut rx) = bare_queue();

        assert!(queue.enqueue(7));
        assert!(!queue.enqueue(7), "Duplicate key must collapse");
        assert!(queue.enqueue(8), "Distinct holds do not collapse");

        assert_eq!(rx.try_recv().unwrap(), 7);
        assert_eq!(rx.try_recv().unwrap(), 8);
        assert!(rx.try_recv().is_err(), "Exactly one dispatch per key");
    }

    #[test]
    fn test_enqueue_after_key_cleared() {
        let (queue, mut rx) = bare_queue();

        assert!(queue.enqueue(7));
        // Worker would clear the key once the job finishes.
        queue.inflight.remove(&job_key(7));
        assert!(queue.enqueue(7));

        assert_eq!(rx.try_recv().unwrap(), 7);
        assert_eq!(rx.try_recv().unwrap(), 7);
    }
}
