//! Request/response DTOs and the error envelope

use axum::{Json, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::hold::Hold;
use crate::money;
use crate::order::Order;
use crate::webhook::SettlementOutcome;

/// Standard API error codes
pub mod error_codes {
    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_STOCK: i32 = 1002;
    pub const HIGH_CONTENTION: i32 = 1003;
    pub const HOLD_INVALID: i32 = 1004;
    pub const INVALID_TRANSITION: i32 = 1005;
    pub const INVALID_PAYMENT_STATUS: i32 = 1006;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4001;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
}

/// Error envelope for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: i32,
    pub msg: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, code: i32, msg: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            code,
            msg: msg.into(),
        }),
    )
}

// --- Requests ---

#[derive(Debug, Deserialize)]
pub struct CreateHoldRequest {
    pub product_id: i64,
    pub qty: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub hold_id: i64,
}

// --- Responses ---

#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    /// Two-fractional-digit decimal string, e.g. "49.99"
    pub price: String,
    pub stock_total: i64,
    pub stock_sold: i64,
    pub available_stock: i64,
}

impl ProductView {
    pub fn from_product(product: Product, available_stock: i64) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: money::format_cents(product.price_cents),
            stock_total: product.stock_total,
            stock_sold: product.stock_sold,
            available_stock,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HoldCreatedView {
    pub hold_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl From<Hold> for HoldCreatedView {
    fn from(hold: Hold) -> Self {
        Self {
            hold_id: hold.id,
            expires_at: hold.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub id: i64,
    pub hold_id: i64,
    pub status: String,
    /// Two-fractional-digit decimal string
    pub amount: String,
    pub created_at: DateTime<Utc>,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            hold_id: order.hold_id,
            status: order.status.as_str().to_string(),
            amount: money::format_cents(order.amount_cents),
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebhookView {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
}

impl From<SettlementOutcome> for WebhookView {
    fn from(outcome: SettlementOutcome) -> Self {
        match outcome {
            SettlementOutcome::Success { order_id } => Self {
                status: "success".to_string(),
                message: "payment recorded, order paid".to_string(),
                order_id: Some(order_id),
            },
            SettlementOutcome::Failed { order_id } => Self {
                status: "failed".to_string(),
                message: "payment failure recorded, order cancelled".to_string(),
                order_id: Some(order_id),
            },
            SettlementOutcome::AlreadyProcessed => Self {
                status: "already_processed".to_string(),
                message: "duplicate delivery ignored".to_string(),
                order_id: None,
            },
            SettlementOutcome::PendingOrder => Self {
                status: "pending_order".to_string(),
                message: "order not found yet, parked for reconciliation".to_string(),
                order_id: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;

    #[test]
    fn test_product_view_formats_price() {
        let product = Product {
            id: 1,
            name: "widget".to_string(),
            price_cents: 4999,
            stock_total: 100,
            stock_sold: 5,
            created_at: Utc::now(),
        };
        let view = ProductView::from_product(product, 95);

        assert_eq!(view.price, "49.99");
        assert_eq!(view.available_stock, 95);
    }

    #[test]
    fn test_order_view_wire_shape() {
        let order = Order {
            id: 3,
            hold_id: 9,
            status: OrderStatus::PendingPayment,
            amount_cents: 24995,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let view = OrderView::from(order);

        assert_eq!(view.status, "pending_payment");
        assert_eq!(view.amount, "249.95");
    }

    #[test]
    fn test_webhook_view_omits_order_id_when_absent() {
        let view = WebhookView::from(SettlementOutcome::PendingOrder);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["status"], "pending_order");
        assert!(json.get("order_id").is_none());
    }
}
