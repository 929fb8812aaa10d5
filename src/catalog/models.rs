use chrono::{DateTime, Utc};
use serde::Serialize;

/// Product row.
///
/// `stock_total` is fixed at seed time; `stock_sold` only ever grows, and only
/// through order settlement. Prices are integer cents (see `crate::money`).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
    pub stock_total: i64,
    pub stock_sold: i64,
    pub created_at: DateTime<Utc>,
}
