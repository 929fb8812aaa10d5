//! Product catalog: model, repository, and the authoritative stock calculator.

pub mod error;
pub mod models;
pub mod repository;
pub mod stock;

pub use error::CatalogError;
pub use models::Product;
pub use repository::ProductRepository;
