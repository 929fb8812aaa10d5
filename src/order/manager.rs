//! Order lifecycle
//!
//! `create_order_from_hold` consumes an active hold into a pending-payment
//! order; `mark_paid` and `cancel` settle it. Every mutation runs under an
//! exclusive row lock on the order (or hold) it settles, and the stock_sold
//! advance commits in the same transaction that flips the status.

use sqlx::PgPool;

use crate::hold::{Hold, HoldManager};
use crate::money;

use super::error::OrderError;
use super::models::{Order, OrderStatus};

#[derive(Clone)]
pub struct OrderManager {
    pool: PgPool,
    holds: HoldManager,
}

impl OrderManager {
    pub fn new(pool: PgPool, holds: HoldManager) -> Self {
        Self { pool, holds }
    }

    /// Convert an active hold into a pending-payment order.
    ///
    /// The hold row is locked for the whole transition, so a concurrent
    /// release or second order attempt observes `used = TRUE` or loses the
    /// lock race, never both succeeding.
    pub async fn create_order_from_hold(&self, hold_id: i64) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let hold = sqlx::query_as::<_, Hold>(
            "SELECT id, product_id, qty, expires_at, used, released, created_at
             FROM holds_tb WHERE id = $1 FOR UPDATE",
        )
        .bind(hold_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(OrderError::HoldNotFound(hold_id))?;

        if hold.used {
            return Err(OrderError::HoldAlreadyUsed);
        }
        if hold.released {
            return Err(OrderError::HoldReleased);
        }
        if hold.expires_at <= chrono::Utc::now() {
            return Err(OrderError::HoldExpired);
        }

        sqlx::query("UPDATE holds_tb SET used = TRUE WHERE id = $1")
            .bind(hold_id)
            .execute(&mut *tx)
            .await?;

        let price_cents: i64 =
            sqlx::query_scalar("SELECT price_cents FROM products_tb WHERE id = $1")
                .bind(hold.product_id)
                .fetch_one(&mut *tx)
                .await?;
        let amount_cents = money::amount_cents(price_cents, hold.qty)?;

        let order = sqlx::query_as::<_, Order>(
            "INSERT INTO orders_tb (hold_id, status, amount_cents)
             VALUES ($1, $2, $3)
             RETURNING id, hold_id, status, amount_cents, created_at, updated_at",
        )
        .bind(hold_id)
        .bind(OrderStatus::PendingPayment)
        .bind(amount_cents)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(order)
    }

    pub async fn get(&self, order_id: i64) -> Result<Option<Order>, OrderError> {
        let order = sqlx::query_as::<_, Order>(
            "SELECT id, hold_id, status, amount_cents, created_at, updated_at
             FROM orders_tb WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Settle an order as paid and advance `stock_sold`.
    ///
    /// Idempotent on already-paid orders. The product row is touched only by
    /// the atomic UPDATE itself; settlements of distinct orders of one
    /// product do not serialize behind the product advisory lock.
    pub async fn mark_paid(&self, order_id: i64) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = self.lock_order(&mut tx, order_id).await?;

        match order.status {
            OrderStatus::Paid => return Ok(order),
            OrderStatus::Cancelled => return Err(OrderError::InvalidTransition),
            OrderStatus::PendingPayment => {}
        }

        let updated = sqlx::query_as::<_, Order>(
            "UPDATE orders_tb SET status = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING id, hold_id, status, amount_cents, created_at, updated_at",
        )
        .bind(OrderStatus::Paid)
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE products_tb p
             SET stock_sold = p.stock_sold + h.qty
             FROM holds_tb h
             WHERE h.id = $1 AND p.id = h.product_id",
        )
        .bind(order.hold_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id, "order settled as paid");
        Ok(updated)
    }

    /// Cancel a pending order, releasing its hold.
    ///
    /// Idempotent on already-cancelled orders. The hold's `released` flag
    /// flips in the same transaction as the status, so the cancelled order
    /// and the still-reserving hold can never be observed together.
    pub async fn cancel(&self, order_id: i64) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = self.lock_order(&mut tx, order_id).await?;

        match order.status {
            OrderStatus::Cancelled => return Ok(order),
            OrderStatus::Paid => return Err(OrderError::CannotCancelPaid),
            OrderStatus::PendingPayment => {}
        }

        let updated = sqlx::query_as::<_, Order>(
            "UPDATE orders_tb SET status = $1, updated_at = NOW()
             WHERE id = $2
             RETURNING id, hold_id, status, amount_cents, created_at, updated_at",
        )
        .bind(OrderStatus::Cancelled)
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        let hold = sqlx::query_as::<_, Hold>(
            "SELECT id, product_id, qty, expires_at, used, released, created_at
             FROM holds_tb WHERE id = $1 FOR UPDATE",
        )
        .bind(order.hold_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE holds_tb SET released = TRUE WHERE id = $1")
            .bind(hold.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.holds.restore_cache(hold.product_id, hold.qty).await;

        tracing::info!(order_id, hold_id = hold.id, "order cancelled, hold released");
        Ok(updated)
    }

    async fn lock_order(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        order_id: i64,
    ) -> Result<Order, OrderError> {
        sqlx::query_as::<_, Order>(
            "SELECT id, hold_id, status, amount_cents, created_at, updated_at
             FROM orders_tb WHERE id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(OrderError::OrderNotFound(order_id))
    }
}
