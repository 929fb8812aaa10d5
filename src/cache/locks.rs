//! Named advisory locks with bounded wait and bounded hold
//!
//! Lease-based mutual exclusion in the SET-NX-PX style: an acquisition stamps
//! the entry with an owner token and a lease deadline, waiters poll until the
//! wait bound elapses, and an entry whose lease has run out may be taken over.
//! Releasing is token-checked so the guard of a taken-over lock cannot free
//! the new owner's entry. Correctness never depends on these locks; they
//! exist to keep row-lock queues short.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy)]
struct Lease {
    token: Uuid,
    expires_at: Instant,
}

#[derive(Clone, Default)]
pub struct AdvisoryLocks {
    entries: Arc<DashMap<String, Lease>>,
}

/// Held lock. Dropping it releases the lock unless the lease already expired
/// and another owner took over.
pub struct AdvisoryGuard {
    entries: Arc<DashMap<String, Lease>>,
    key: String,
    token: Uuid,
}

impl Drop for AdvisoryGuard {
    fn drop(&mut self) {
        let token = self.token;
        self.entries.remove_if(&self.key, |_, lease| lease.token == token);
    }
}

impl AdvisoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the lock for up to `wait`; the acquired lease lasts at most
    /// `lease` before it becomes eligible for takeover. Returns None on
    /// timeout (callers surface `HighContention`).
    pub async fn acquire(
        &self,
        key: &str,
        wait: Duration,
        lease: Duration,
    ) -> Option<AdvisoryGuard> {
        let deadline = Instant::now() + wait;

        loop {
            if let Some(guard) = self.try_acquire(key, lease) {
                return Some(guard);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn try_acquire(&self, key: &str, lease: Duration) -> Option<AdvisoryGuard> {
        let token = Uuid::new_v4();
        let now = Instant::now();
        let new_lease = Lease {
            token,
            expires_at: now + lease,
        };

        match self.entries.entry(key.to_string()) {
            MapEntry::Vacant(slot) => {
                slot.insert(new_lease);
            }
            MapEntry::Occupied(mut slot) => {
                if slot.get().expires_at > now {
                    return None;
                }
                // Expired holder: take the lease over.
                slot.insert(new_lease);
            }
        }

        Some(AdvisoryGuard {
            entries: self.entries.clone(),
            key: key.to_string(),
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_and_drop_release() {
        let locks = AdvisoryLocks::new();

        let guard = locks
            .acquire("lock:product:1", Duration::from_millis(50), Duration::from_secs(5))
            .await;
        assert!(guard.is_some());
        drop(guard);

        let again = locks
            .acquire("lock:product:1", Duration::from_millis(50), Duration::from_secs(5))
            .await;
        assert!(again.is_some(), "Dropped guard should free the lock");
    }

    #[tokio::test]
    async fn test_contended_acquire_times_out() {
        let locks = AdvisoryLocks::new();

        let _held = locks
            .acquire("lock:product:1", Duration::from_millis(50), Duration::from_secs(5))
            .await
            .unwrap();

        let contender = locks
            .acquire("lock:product:1", Duration::from_millis(80), Duration::from_secs(5))
            .await;
        assert!(contender.is_none(), "Second acquire should time out");
    }

    #[tokio::test]
    async fn test_unrelated_keys_do_not_contend() {
        let locks = AdvisoryLocks::new();

        let _a = locks
            .acquire("lock:product:1", Duration::from_millis(50), Duration::from_secs(5))
            .await
            .unwrap();
        let b = locks
            .acquire("lock:product:2", Duration::from_millis(50), Duration::from_secs(5))
            .await;
        assert!(b.is_some());
    }

    #[tokio::test]
    async fn test_expired_lease_takeover() {
        let locks = AdvisoryLocks::new();

        let stale = locks
            .acquire("lock:hold:9", Duration::from_millis(50), Duration::from_millis(30))
            .await
            .unwrap();

        // Lease runs out while the first guard is still alive.
        tokio::time::sleep(Duration::from_millis(60)).await;

        let taker = locks
            .acquire("lock:hold:9", Duration::from_millis(50), Duration::from_secs(5))
            .await;
        assert!(taker.is_some(), "Expired lease should be taken over");

        // The stale guard's drop must not release the new owner's lease.
        drop(stale);
        let contender = locks
            .acquire("lock:hold:9", Duration::from_millis(80), Duration::from_secs(5))
            .await;
        assert!(
            contender.is_none(),
            "Taken-over lock must survive the stale guard's drop"
        );
    }
}
