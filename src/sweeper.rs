//! Expiry sweeper
//!
//! Once a minute, every hold past its TTL that was never used or released is
//! scheduled for release via the keyed job queue. The sweep itself is
//! read-only; the jobs do the locking and flag flips, so a crashed sweep
//! loses nothing and a double sweep collapses in the queue.

use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::jobs::ReleaseQueue;

pub struct ExpirySweeper {
    pool: PgPool,
    queue: ReleaseQueue,
    interval: Duration,
}

impl ExpirySweeper {
    pub fn new(pool: PgPool, queue: ReleaseQueue, interval: Duration) -> Self {
        Self {
            pool,
            queue,
            interval,
        }
    }

    /// Run the sweep loop forever.
    pub async fn run(&self) {
        info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");

        loop {
            match self.sweep_once().await {
                Ok(0) => debug!("no expired holds"),
                Ok(n) => info!(enqueued = n, "scheduled expired holds for release"),
                Err(e) => error!(error = %e, "expiry sweep failed"),
            }

            tokio::time::sleep(self.interval).await;
        }
    }

    /// Run a single sweep iteration (for testing). Returns how many release
    /// jobs were newly enqueued.
    pub async fn sweep_once(&self) -> Result<usize, sqlx::Error> {
        let expired: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM holds_tb
             WHERE expires_at <= NOW() AND used = FALSE AND released = FALSE
             ORDER BY expires_at",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut enqueued = 0usize;
        for hold_id in expired {
            if self.queue.enqueue(hold_id) {
                enqueued += 1;
            }
        }

        Ok(enqueued)
    }
}
