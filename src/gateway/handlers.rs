//! HTTP handlers and the error-kind -> status-code mapping

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::warn;

use crate::hold::HoldError;
use crate::order::OrderError;
use crate::webhook::{RawWebhookPayload, WebhookError};

use super::state::AppState;
use super::types::{
    ApiError, CreateHoldRequest, CreateOrderRequest, HealthView, HoldCreatedView, OrderView,
    ProductView, WebhookView, api_error, error_codes,
};

/// GET /health
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthView>, ApiError> {
    state.db.health_check().await.map_err(|e| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::INTERNAL_ERROR,
            format!("store unavailable: {}", e),
        )
    })?;
    Ok(Json(HealthView { status: "ok" }))
}

/// GET /products/{id}
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<i64>,
) -> Result<Json<ProductView>, ApiError> {
    let product = state
        .products
        .get(product_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            api_error(
                StatusCode::NOT_FOUND,
                error_codes::NOT_FOUND,
                format!("product {} not found", product_id),
            )
        })?;

    let available = state
        .cache
        .get_available(state.db.pool(), product_id)
        .await
        .map_err(internal)?;

    Ok(Json(ProductView::from_product(product, available)))
}

/// POST /holds
pub async fn create_hold(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateHoldRequest>,
) -> Result<(StatusCode, Json<HoldCreatedView>), ApiError> {
    let hold = state
        .holds
        .create_hold(req.product_id, req.qty)
        .await
        .map_err(map_hold_error)?;

    Ok((StatusCode::CREATED, Json(hold.into())))
}

/// POST /orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let order = state
        .orders
        .create_order_from_hold(req.hold_id)
        .await
        .map_err(map_order_error)?;

    // The payment webhook may have beaten the order here; replay anything
    // parked for it. The order itself is already committed, so reconciliation
    // failures must not fail the request.
    match state.settlement.reconcile_pending(order.id).await {
        Ok(0) => {}
        Ok(n) => tracing::info!(order_id = order.id, settled = n, "parked webhooks reconciled"),
        Err(e) => warn!(order_id = order.id, error = %e, "webhook reconciliation failed"),
    }

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// POST /payments/webhook
pub async fn payments_webhook(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawWebhookPayload>,
) -> Result<Json<WebhookView>, ApiError> {
    let payload = raw.validate().map_err(map_webhook_error)?;

    let outcome = state
        .settlement
        .handle(payload)
        .await
        .map_err(map_webhook_error)?;

    Ok(Json(outcome.into()))
}

// --- Error mapping ---

fn map_hold_error(err: HoldError) -> ApiError {
    match err {
        HoldError::InvalidQty => api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            error_codes::INVALID_PARAMETER,
            err.to_string(),
        ),
        HoldError::ProductNotFound(_) => {
            api_error(StatusCode::BAD_REQUEST, error_codes::NOT_FOUND, err.to_string())
        }
        HoldError::InsufficientStock => api_error(
            StatusCode::BAD_REQUEST,
            error_codes::INSUFFICIENT_STOCK,
            err.to_string(),
        ),
        HoldError::HighContention => api_error(
            StatusCode::BAD_REQUEST,
            error_codes::HIGH_CONTENTION,
            err.to_string(),
        ),
        HoldError::Database(_) => internal(err),
    }
}

fn map_order_error(err: OrderError) -> ApiError {
    match err {
        OrderError::HoldNotFound(_) | OrderError::OrderNotFound(_) => {
            api_error(StatusCode::BAD_REQUEST, error_codes::NOT_FOUND, err.to_string())
        }
        OrderError::HoldAlreadyUsed | OrderError::HoldReleased | OrderError::HoldExpired => {
            api_error(StatusCode::BAD_REQUEST, error_codes::HOLD_INVALID, err.to_string())
        }
        OrderError::InvalidTransition | OrderError::CannotCancelPaid => api_error(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_TRANSITION,
            err.to_string(),
        ),
        OrderError::Database(_) | OrderError::Amount(_) => internal(err),
    }
}

fn map_webhook_error(err: WebhookError) -> ApiError {
    match err {
        WebhookError::MissingField(_) => api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            error_codes::INVALID_PARAMETER,
            err.to_string(),
        ),
        WebhookError::InvalidPaymentStatus(_) => api_error(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PAYMENT_STATUS,
            err.to_string(),
        ),
        WebhookError::Settlement(inner) => map_order_error(inner),
        WebhookError::Database(_) | WebhookError::Payload(_) => internal(err),
    }
}

fn internal(err: impl std::fmt::Display) -> ApiError {
    warn!(error = %err, "internal error");
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        error_codes::INTERNAL_ERROR,
        "internal error",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_error_mapping() {
        let (status, body) = map_hold_error(HoldError::InvalidQty);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.code, error_codes::INVALID_PARAMETER);

        let (status, body) = map_hold_error(HoldError::InsufficientStock);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, error_codes::INSUFFICIENT_STOCK);

        let (status, _) = map_hold_error(HoldError::HighContention);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_order_error_mapping() {
        let (status, body) = map_order_error(OrderError::HoldExpired);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, error_codes::HOLD_INVALID);

        let (status, _) = map_order_error(OrderError::HoldNotFound(1));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_webhook_error_mapping() {
        let (status, _) = map_webhook_error(WebhookError::MissingField("order_id"));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) =
            map_webhook_error(WebhookError::InvalidPaymentStatus("refunded".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
