//! Hold creation and release
//!
//! Creation runs under two levels of locking: the per-product advisory lock
//! thins the queue, the row lock on the product is the correctness boundary.
//! The admission decision always comes from the transactional stock
//! calculator; the counter cache is rewritten whenever it disagrees and then
//! decremented alongside the insert.

use chrono::Utc;
use sqlx::PgPool;
use tracing::warn;

use crate::cache::{AdvisoryLocks, StockCache, hold_lock_key, product_lock_key};
use crate::catalog::{CatalogError, ProductRepository, stock};
use crate::config::CheckoutConfig;

use super::error::HoldError;
use super::models::Hold;

#[derive(Clone)]
pub struct HoldManager {
    pool: PgPool,
    cache: StockCache,
    locks: AdvisoryLocks,
    cfg: CheckoutConfig,
}

impl HoldManager {
    pub fn new(
        pool: PgPool,
        cache: StockCache,
        locks: AdvisoryLocks,
        cfg: CheckoutConfig,
    ) -> Self {
        Self {
            pool,
            cache,
            locks,
            cfg,
        }
    }

    /// Reserve `qty` units of a product.
    ///
    /// Retried on store-reported deadlock with exponential backoff
    /// (200/400/800 ms); exhaustion surfaces as `HighContention`.
    pub async fn create_hold(&self, product_id: i64, qty: i64) -> Result<Hold, HoldError> {
        if qty <= 0 {
            return Err(HoldError::InvalidQty);
        }

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.try_create(product_id, qty).await {
                Err(HoldError::Database(e)) if is_deadlock(&e) => {
                    if attempt >= self.cfg.create_attempts {
                        warn!(product_id, attempt, "hold creation exhausted deadlock retries");
                        return Err(HoldError::HighContention);
                    }
                    let backoff = backoff_ms(self.cfg.backoff_unit_ms, attempt);
                    warn!(product_id, attempt, backoff_ms = backoff, "deadlock, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                }
                other => return other,
            }
        }
    }

    async fn try_create(&self, product_id: i64, qty: i64) -> Result<Hold, HoldError> {
        let _product_lock = self
            .locks
            .acquire(
                &product_lock_key(product_id),
                std::time::Duration::from_secs(self.cfg.product_lock_wait_secs),
                std::time::Duration::from_secs(self.cfg.product_lock_lease_secs),
            )
            .await
            .ok_or(HoldError::HighContention)?;

        let mut tx = self.pool.begin().await?;

        ProductRepository::lock(&mut *tx, product_id)
            .await
            .map_err(|e| match e {
                CatalogError::ProductNotFound(id) => HoldError::ProductNotFound(id),
                CatalogError::Database(e) => HoldError::Database(e),
            })?;

        let available = stock::available(&mut *tx, product_id)
            .await
            .map_err(|e| match e {
                CatalogError::ProductNotFound(id) => HoldError::ProductNotFound(id),
                CatalogError::Database(e) => HoldError::Database(e),
            })?;

        // Counter repair happens inside the lock so readers never see the
        // corrupt value once a writer has observed it.
        if self.cache.get(product_id) != Some(available) {
            self.cache.put(product_id, available);
        }

        if available < qty {
            return Err(HoldError::InsufficientStock);
        }

        let expires_at =
            Utc::now() + chrono::Duration::seconds(self.cfg.hold_ttl_secs as i64);

        let hold = sqlx::query_as::<_, Hold>(
            "INSERT INTO holds_tb (product_id, qty, expires_at)
             VALUES ($1, $2, $3)
             RETURNING id, product_id, qty, expires_at, used, released, created_at",
        )
        .bind(product_id)
        .bind(qty)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        self.cache.decr(product_id, qty);

        tx.commit().await?;

        Ok(hold)
    }

    /// Release a hold, returning stock to the pool.
    ///
    /// Returns false for missing holds and for holds already settled either
    /// way (`used` or `released`); true only when this call flipped the flag.
    pub async fn release_hold(&self, hold_id: i64) -> Result<bool, HoldError> {
        let _hold_lock = self
            .locks
            .acquire(
                &hold_lock_key(hold_id),
                std::time::Duration::from_secs(self.cfg.hold_lock_wait_secs),
                std::time::Duration::from_secs(self.cfg.hold_lock_lease_secs),
            )
            .await
            .ok_or(HoldError::HighContention)?;

        let mut tx = self.pool.begin().await?;

        let hold = sqlx::query_as::<_, Hold>(
            "SELECT id, product_id, qty, expires_at, used, released, created_at
             FROM holds_tb WHERE id = $1 FOR UPDATE",
        )
        .bind(hold_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(hold) = hold else {
            return Ok(false);
        };
        if hold.used || hold.released {
            return Ok(false);
        }

        sqlx::query("UPDATE holds_tb SET released = TRUE WHERE id = $1")
            .bind(hold_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.restore_cache(hold.product_id, hold.qty).await;

        Ok(true)
    }

    /// Best-effort counter restore after stock returned to the pool. Failures
    /// are logged and swallowed: the calculator stays authoritative and the
    /// counter self-heals on its next refresh.
    pub(crate) async fn restore_cache(&self, product_id: i64, qty: i64) {
        let lock = self
            .locks
            .acquire(
                &product_lock_key(product_id),
                std::time::Duration::from_secs(self.cfg.restore_lock_wait_secs),
                std::time::Duration::from_secs(self.cfg.restore_lock_lease_secs),
            )
            .await;

        match lock {
            Some(_guard) => {
                if self.cache.incr(product_id, qty).is_none() {
                    if let Err(e) = self.cache.refresh(&self.pool, product_id).await {
                        warn!(product_id, error = %e, "cache refresh after release failed");
                    }
                }
            }
            None => {
                // Lock wait exhausted: skip the increment and recompute.
                if let Err(e) = self.cache.refresh(&self.pool, product_id).await {
                    warn!(product_id, error = %e, "cache refresh after release failed");
                }
            }
        }
    }
}

/// Store-reported deadlock / serialization failure: Postgres SQLSTATE 40001
/// and 40P01, MySQL vendor code 1213.
pub(crate) fn is_deadlock(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01") | Some("1213"))
        }
        _ => false,
    }
}

fn backoff_ms(unit_ms: u64, attempt: u32) -> u64 {
    unit_ms * 2u64.saturating_pow(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_ms(100, 1), 200);
        assert_eq!(backoff_ms(100, 2), 400);
        assert_eq!(backoff_ms(100, 3), 800);
    }

    #[test]
    fn test_io_error_is_not_deadlock() {
        let err = sqlx::Error::PoolTimedOut;
        assert!(!is_deadlock(&err));
    }
}
