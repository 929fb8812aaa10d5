//! Orders: the pending-payment settlement state machine over a hold.

pub mod error;
pub mod manager;
pub mod models;

pub use error::OrderError;
pub use manager::OrderManager;
pub use models::{Order, OrderStatus};
