use thiserror::Error;

use crate::order::OrderError;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid payment status: {0}")]
    InvalidPaymentStatus(String),

    #[error("Payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Settlement failed: {0}")]
    Settlement(#[from] OrderError),
}
