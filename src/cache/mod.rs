//! Advisory fast path: TTL'd per-product stock counters and named lease locks.
//!
//! Nothing in this module is a correctness gate. The transactional stock
//! calculator decides every admission; the counter only amortizes the
//! aggregation query on reads, and the locks only thin out row-lock
//! contention.

pub mod locks;
pub mod stock_cache;

pub use locks::{AdvisoryGuard, AdvisoryLocks};
pub use stock_cache::StockCache;

/// Cache key for a product's advisory available-stock counter.
pub fn stock_key(product_id: i64) -> String {
    format!("product:{product_id}:available_stock")
}

/// Advisory mutex key serializing hold creation/release per product.
pub fn product_lock_key(product_id: i64) -> String {
    format!("lock:product:{product_id}")
}

/// Advisory mutex key serializing operations on a single hold.
pub fn hold_lock_key(hold_id: i64) -> String {
    format!("lock:hold:{hold_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        assert_eq!(stock_key(7), "product:7:available_stock");
        assert_eq!(product_lock_key(7), "lock:product:7");
        assert_eq!(hold_lock_key(42), "lock:hold:42");
    }
}
