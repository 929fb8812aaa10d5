//! flash_checkout - Flash-Sale Checkout Core
//!
//! Oversell-safe two-phase checkout over PostgreSQL: time-bounded stock
//! holds, pending-payment orders, and idempotent webhook settlement, with an
//! advisory counter cache and per-product lease locks in front of the
//! row-lock boundary.
//!
//! # Modules
//!
//! - [`config`] - Application configuration (YAML + env overrides)
//! - [`logging`] - tracing subscriber bootstrap
//! - [`db`] - connection pool and schema bootstrap
//! - [`money`] - integer-cent fixed-point arithmetic
//! - [`catalog`] - products and the authoritative stock calculator
//! - [`cache`] - advisory stock counters and named lease locks
//! - [`hold`] - stock reservations under two-level locking
//! - [`order`] - pending_payment -> paid/cancelled state machine
//! - [`webhook`] - idempotent, out-of-order-safe payment settlement
//! - [`jobs`] - uniquely-keyed release-job queue
//! - [`sweeper`] - periodic expiry sweep
//! - [`gateway`] - axum HTTP layer

pub mod config;
pub mod logging;

pub mod db;
pub mod money;

pub mod cache;
pub mod catalog;
pub mod hold;
pub mod order;
pub mod webhook;

pub mod gateway;
pub mod jobs;
pub mod sweeper;

// Convenient re-exports at crate root
pub use cache::{AdvisoryLocks, StockCache};
pub use catalog::{Product, ProductRepository};
pub use config::AppConfig;
pub use db::Database;
pub use hold::{Hold, HoldManager};
pub use order::{Order, OrderManager, OrderStatus};
pub use sweeper::ExpirySweeper;
pub use webhook::{SettlementOutcome, WebhookSettlement};
