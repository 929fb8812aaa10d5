//! Webhook processing
//!
//! The unique idempotency key makes processing exactly-once across duplicate
//! and racing deliveries; a delivery that beats its own order's creation is
//! parked as `pending_order` and replayed by reconciliation once the order
//! exists.

use sqlx::PgPool;
use tracing::{info, warn};

use crate::order::OrderManager;

use super::error::WebhookError;
use super::models::{PaymentStatus, WebhookLog, WebhookPayload, WebhookStatus};

/// Outcome reported to the webhook caller. All four are HTTP 200; the
/// informational statuses tell the upstream retry machinery to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// Payment confirmed, order marked paid.
    Success { order_id: i64 },
    /// Payment failed, order cancelled and hold released.
    Failed { order_id: i64 },
    /// This idempotency key was already handled.
    AlreadyProcessed,
    /// No such order yet; parked for reconciliation.
    PendingOrder,
}

#[derive(Clone)]
pub struct WebhookSettlement {
    pool: PgPool,
    orders: OrderManager,
}

impl WebhookSettlement {
    pub fn new(pool: PgPool, orders: OrderManager) -> Self {
        Self { pool, orders }
    }

    /// Process one webhook delivery.
    ///
    /// The log insert claims the idempotency key; a unique-constraint
    /// violation means a racing delivery with the same key won, and this one
    /// reports `AlreadyProcessed` without side effects.
    pub async fn handle(&self, payload: WebhookPayload) -> Result<SettlementOutcome, WebhookError> {
        let status = PaymentStatus::parse(&payload.payment_status)?;
        let payload_json = serde_json::to_value(&payload)?;

        let mut tx = self.pool.begin().await?;

        let seen: Option<i64> =
            sqlx::query_scalar("SELECT id FROM webhook_logs_tb WHERE idempotency_key = $1")
                .bind(&payload.idempotency_key)
                .fetch_optional(&mut *tx)
                .await?;
        if seen.is_some() {
            return Ok(SettlementOutcome::AlreadyProcessed);
        }

        let order_exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM orders_tb WHERE id = $1")
                .bind(payload.order_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (log_status, processed_at) = if order_exists.is_some() {
            (WebhookStatus::Processed, Some(chrono::Utc::now()))
        } else {
            (WebhookStatus::PendingOrder, None)
        };

        let inserted = sqlx::query(
            "INSERT INTO webhook_logs_tb (idempotency_key, payload, status, processed_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&payload.idempotency_key)
        .bind(&payload_json)
        .bind(log_status)
        .bind(processed_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_unique_violation(&e) {
                return Ok(SettlementOutcome::AlreadyProcessed);
            }
            return Err(e.into());
        }

        tx.commit().await?;

        let Some(order_id) = order_exists else {
            info!(
                order_id = payload.order_id,
                idempotency_key = %payload.idempotency_key,
                "webhook arrived before its order; parked as pending_order"
            );
            return Ok(SettlementOutcome::PendingOrder);
        };

        // Key is burned; settle under the order row lock.
        match status {
            PaymentStatus::Success => {
                self.orders.mark_paid(order_id).await?;
                Ok(SettlementOutcome::Success { order_id })
            }
            PaymentStatus::Failed => {
                self.orders.cancel(order_id).await?;
                Ok(SettlementOutcome::Failed { order_id })
            }
        }
    }

    /// Replay parked webhooks for a freshly created order.
    ///
    /// Each matching log settles independently; a failure leaves that row
    /// `pending_order` for a later pass and never aborts the sweep. Returns
    /// how many logs were settled.
    pub async fn reconcile_pending(&self, order_id: i64) -> Result<usize, WebhookError> {
        let logs = sqlx::query_as::<_, WebhookLog>(
            "SELECT id, idempotency_key, payload, status, processed_at
             FROM webhook_logs_tb WHERE status = $1",
        )
        .bind(WebhookStatus::PendingOrder)
        .fetch_all(&self.pool)
        .await?;

        let mut settled = 0usize;
        for log in logs {
            let payload: WebhookPayload = match serde_json::from_value(log.payload.clone()) {
                Ok(p) => p,
                Err(e) => {
                    warn!(log_id = log.id, error = %e, "unreadable pending webhook payload");
                    continue;
                }
            };
            if payload.order_id != order_id {
                continue;
            }

            match self.settle_parked(&log, &payload).await {
                Ok(true) => settled += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        log_id = log.id,
                        order_id,
                        error = %e,
                        "reconciliation failed; row stays pending_order"
                    );
                }
            }
        }

        Ok(settled)
    }

    async fn settle_parked(
        &self,
        log: &WebhookLog,
        payload: &WebhookPayload,
    ) -> Result<bool, WebhookError> {
        let status = PaymentStatus::parse(&payload.payment_status)?;

        // Re-verify: the order must exist by now.
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders_tb WHERE id = $1")
            .bind(payload.order_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        match status {
            PaymentStatus::Success => {
                self.orders.mark_paid(payload.order_id).await?;
            }
            PaymentStatus::Failed => {
                self.orders.cancel(payload.order_id).await?;
            }
        }

        // Settlement is idempotent, so a racing reconciler repeating it is
        // harmless; the guarded update keeps the settled count honest.
        let flipped = sqlx::query(
            "UPDATE webhook_logs_tb SET status = $1, processed_at = NOW()
             WHERE id = $2 AND status = $3",
        )
        .bind(WebhookStatus::Processed)
        .bind(log.id)
        .bind(WebhookStatus::PendingOrder)
        .execute(&self.pool)
        .await?;

        if flipped.rows_affected() > 0 {
            info!(
                log_id = log.id,
                order_id = payload.order_id,
                "parked webhook reconciled"
            );
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Unique-constraint violation: Postgres SQLSTATE 23505.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn test_outcome_equality() {
        assert_eq!(
            SettlementOutcome::Success { order_id: 3 },
            SettlementOutcome::Success { order_id: 3 }
        );
        assert_ne!(
            SettlementOutcome::Success { order_id: 3 },
            SettlementOutcome::Failed { order_id: 3 }
        );
    }
}
