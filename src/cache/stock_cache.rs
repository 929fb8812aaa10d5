//! TTL'd atomic stock counters
//!
//! One counter per product under the key `product:{id}:available_stock`.
//! Counters are written under the product advisory lock by the hold/order
//! paths, decremented on hold creation, incremented on release, and refreshed
//! from the authoritative calculator whenever a divergence is observed. A
//! bounded TTL caps how long a crashed writer can leave a stale value behind.

use dashmap::DashMap;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog::{CatalogError, stock};

use super::stock_key;

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: i64,
    expires_at: Instant,
}

#[derive(Clone)]
pub struct StockCache {
    entries: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl StockCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Read the cached counter. Expired entries miss; live values are floored
    /// at zero (a counter driven negative by stale decrements must never show
    /// negative availability).
    pub fn get(&self, product_id: i64) -> Option<i64> {
        let key = stock_key(product_id);
        let entry = self.entries.get(&key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove_if(&key, |_, e| e.expires_at <= Instant::now());
            return None;
        }
        Some(entry.value.max(0))
    }

    /// Overwrite the counter, restarting its TTL.
    pub fn put(&self, product_id: i64, value: i64) {
        self.entries.insert(
            stock_key(product_id),
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Atomically add `delta` to a live counter. Returns the new value, or
    /// None when the counter is absent or expired (callers then refresh from
    /// the store instead).
    pub fn incr(&self, product_id: i64, delta: i64) -> Option<i64> {
        let key = stock_key(product_id);
        let mut entry = self.entries.get_mut(&key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove_if(&key, |_, e| e.expires_at <= Instant::now());
            return None;
        }
        entry.value += delta;
        Some(entry.value)
    }

    pub fn decr(&self, product_id: i64, delta: i64) -> Option<i64> {
        self.incr(product_id, -delta)
    }

    /// Fast-path read: cached value when present, otherwise authoritative
    /// recompute cached for the next reader.
    pub async fn get_available(
        &self,
        pool: &PgPool,
        product_id: i64,
    ) -> Result<i64, CatalogError> {
        if let Some(value) = self.get(product_id) {
            return Ok(value);
        }
        self.refresh(pool, product_id).await
    }

    /// Recompute from the store and overwrite the counter.
    pub async fn refresh(&self, pool: &PgPool, product_id: i64) -> Result<i64, CatalogError> {
        let available = stock::available(pool, product_id).await?;
        self.put(product_id, available);
        Ok(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let cache = StockCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(1), None);

        cache.put(1, 95);
        assert_eq!(cache.get(1), Some(95));
        assert_eq!(cache.get(2), None);
    }

    #[test]
    fn test_get_floors_at_zero() {
        let cache = StockCache::new(Duration::from_secs(60));
        cache.put(1, 2);
        cache.decr(1, 5);
        assert_eq!(cache.get(1), Some(0));
    }

    #[test]
    fn test_incr_decr() {
        let cache = StockCache::new(Duration::from_secs(60));
        cache.put(1, 100);

        assert_eq!(cache.decr(1, 5), Some(95));
        assert_eq!(cache.incr(1, 5), Some(100));
    }

    #[test]
    fn test_incr_on_absent_counter_is_noop() {
        let cache = StockCache::new(Duration::from_secs(60));
        assert_eq!(cache.incr(1, 5), None);
        assert_eq!(cache.decr(1, 5), None);
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = StockCache::new(Duration::from_millis(20));
        cache.put(1, 50);
        assert_eq!(cache.get(1), Some(50));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.incr(1, 5), None);
    }
}
