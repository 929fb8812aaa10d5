use thiserror::Error;

#[derive(Debug, Error)]
pub enum HoldError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Quantity must be positive")]
    InvalidQty,

    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    #[error("Insufficient stock")]
    InsufficientStock,

    #[error("High contention, please retry")]
    HighContention,
}
