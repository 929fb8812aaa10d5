//! Payment webhook settlement: idempotent, out-of-order-safe.

pub mod error;
pub mod models;
pub mod settlement;

pub use error::WebhookError;
pub use models::{PaymentStatus, RawWebhookPayload, WebhookLog, WebhookPayload, WebhookStatus};
pub use settlement::{SettlementOutcome, WebhookSettlement};
