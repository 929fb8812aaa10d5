//! HTTP gateway
//!
//! Thin axum layer over the checkout core: validated DTOs in, domain calls,
//! flat JSON out. Error kinds map to status codes in `handlers`.

pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/products/{id}", get(handlers::get_product))
        .route("/holds", post(handlers::create_hold))
        .route("/orders", post(handlers::create_order))
        .route("/payments/webhook", post(handlers::payments_webhook))
        .with_state(state)
}

/// Start the HTTP gateway and serve until shutdown.
pub async fn run_server(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!("Gateway listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
