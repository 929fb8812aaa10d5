use thiserror::Error;

use crate::money::MoneyError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Hold not found: {0}")]
    HoldNotFound(i64),

    #[error("Hold already used by another order")]
    HoldAlreadyUsed,

    #[error("Hold has been released")]
    HoldReleased,

    #[error("Hold has expired")]
    HoldExpired,

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Cannot mark a cancelled order as paid")]
    InvalidTransition,

    #[error("Cannot cancel a paid order")]
    CannotCancelPaid,

    #[error("Amount computation failed: {0}")]
    Amount(#[from] MoneyError),
}
