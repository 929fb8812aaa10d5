//! Authoritative available-stock computation
//!
//! `available = stock_total - stock_sold - active holds - pending-settlement
//! holds`, floored at zero. Holds whose order is still awaiting its payment
//! webhook keep reserving stock; dropping them from the sum is exactly the
//! window in which a product oversells.

use sqlx::PgExecutor;

use super::error::CatalogError;

/// Compute available stock for a product from the store.
///
/// The two subqueries are disjoint (`used = FALSE` vs `used = TRUE`), and the
/// whole computation is a single statement so it observes one snapshot. Pass a
/// transaction handle to evaluate under the caller's locks; the product-GET
/// path passes the pool directly.
pub async fn available<'e>(
    executor: impl PgExecutor<'e>,
    product_id: i64,
) -> Result<i64, CatalogError> {
    let raw: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT p.stock_total - p.stock_sold
            - COALESCE((SELECT SUM(h.qty)
                        FROM holds_tb h
                        WHERE h.product_id = p.id
                          AND h.used = FALSE
                          AND h.released = FALSE
                          AND h.expires_at > NOW()), 0)::BIGINT
            - COALESCE((SELECT SUM(h.qty)
                        FROM holds_tb h
                        JOIN orders_tb o ON o.hold_id = h.id
                        WHERE h.product_id = p.id
                          AND h.used = TRUE
                          AND h.released = FALSE
                          AND o.status = 10), 0)::BIGINT
        FROM products_tb p
        WHERE p.id = $1
        "#,
    )
    .bind(product_id)
    .fetch_optional(executor)
    .await?;

    let raw = raw.ok_or(CatalogError::ProductNotFound(product_id))?;
    Ok(raw.max(0))
}
