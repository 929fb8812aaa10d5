use sqlx::{PgConnection, PgPool};

use super::error::CatalogError;
use super::models::Product;

/// Read/seed access to `products_tb`.
///
/// The only mutation of a product after seeding is the `stock_sold` advance,
/// which belongs to order settlement and lives with the Order Manager.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, product_id: i64) -> Result<Option<Product>, CatalogError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price_cents, stock_total, stock_sold, created_at
             FROM products_tb WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Row-level exclusive lock on the product; the correctness boundary for
    /// hold creation. Must run inside a transaction.
    pub async fn lock(
        conn: &mut PgConnection,
        product_id: i64,
    ) -> Result<Product, CatalogError> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, price_cents, stock_total, stock_sold, created_at
             FROM products_tb WHERE id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(CatalogError::ProductNotFound(product_id))?;

        Ok(product)
    }

    /// Seed a product. Master data normally arrives out-of-band; this exists
    /// for bootstrap scripts and the integration tests.
    pub async fn create(
        &self,
        name: &str,
        price_cents: i64,
        stock_total: i64,
    ) -> Result<Product, CatalogError> {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products_tb (name, price_cents, stock_total)
             VALUES ($1, $2, $3)
             RETURNING id, name, price_cents, stock_total, stock_sold, created_at",
        )
        .bind(name)
        .bind(price_cents)
        .bind(stock_total)
        .fetch_one(&self.pool)
        .await?;

        Ok(product)
    }
}
