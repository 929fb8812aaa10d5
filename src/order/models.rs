//! Order model and status codes
//!
//! Status IDs are stored as SMALLINT; terminal states are absorbing.

use chrono::{DateTime, Utc};
use std::fmt;

/// Order status.
///
/// Transitions are restricted to `PendingPayment -> Paid` and
/// `PendingPayment -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[repr(i16)]
pub enum OrderStatus {
    /// Awaiting the payment webhook; the backing hold still reserves stock.
    PendingPayment = 10,

    /// Terminal: payment confirmed, `stock_sold` advanced.
    Paid = 20,

    /// Terminal: payment failed or order cancelled, hold released.
    Cancelled = -10,
}

impl OrderStatus {
    /// Check if this is a terminal state (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// Numeric status ID as stored in PostgreSQL
    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    /// Convert from a stored status ID
    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            10 => Some(OrderStatus::PendingPayment),
            20 => Some(OrderStatus::Paid),
            -10 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    /// Wire name used in API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<i16> for OrderStatus {
    type Error = ();

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        OrderStatus::from_id(value).ok_or(())
    }
}

/// Order row. `hold_id` is 1:1 with the backing hold; `amount_cents` is fixed
/// at creation as `hold.qty * product.price_cents`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    pub hold_id: i64,
    pub status: OrderStatus,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::PendingPayment.is_terminal());
    }

    #[test]
    fn test_status_id_roundtrip() {
        let statuses = [
            OrderStatus::PendingPayment,
            OrderStatus::Paid,
            OrderStatus::Cancelled,
        ];

        for status in statuses {
            let id = status.id();
            let recovered = OrderStatus::from_id(id).unwrap();
            assert_eq!(status, recovered);
        }
    }

    #[test]
    fn test_invalid_status_id() {
        assert!(OrderStatus::from_id(0).is_none());
        assert!(OrderStatus::from_id(999).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(OrderStatus::PendingPayment.to_string(), "pending_payment");
        assert_eq!(OrderStatus::Paid.to_string(), "paid");
        assert_eq!(OrderStatus::Cancelled.to_string(), "cancelled");
    }
}
