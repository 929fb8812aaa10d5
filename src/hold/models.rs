use chrono::{DateTime, Utc};
use serde::Serialize;

/// Hold row.
///
/// A fresh hold moves into exactly one of `used` (order created) or
/// `released` (explicit release or expiry sweep); both flags are monotone
/// once set. The one path that overlaps them is order cancellation, which
/// releases a hold that was already used.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Hold {
    pub id: i64,
    pub product_id: i64,
    pub qty: i64,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub released: bool,
    pub created_at: DateTime<Utc>,
}

impl Hold {
    /// Still reserving stock and convertible into an order.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.released && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hold(used: bool, released: bool, expires_in_secs: i64) -> Hold {
        let now = Utc::now();
        Hold {
            id: 1,
            product_id: 1,
            qty: 5,
            expires_at: now + Duration::seconds(expires_in_secs),
            used,
            released,
            created_at: now,
        }
    }

    #[test]
    fn test_fresh_unexpired_hold_is_active() {
        assert!(hold(false, false, 120).is_active(Utc::now()));
    }

    #[test]
    fn test_used_released_or_expired_is_not_active() {
        let now = Utc::now();
        assert!(!hold(true, false, 120).is_active(now));
        assert!(!hold(false, true, 120).is_active(now));
        assert!(!hold(false, false, -1).is_active(now));
    }
}
