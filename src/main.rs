//! flash_checkout service entry point
//!
//! Wiring order follows the service DAG: store, cache and locks, hold
//! manager, order manager, webhook settlement, then the release worker and
//! expiry sweeper on their own tasks, and finally the HTTP gateway.

use std::sync::Arc;

use flash_checkout::cache::{AdvisoryLocks, StockCache};
use flash_checkout::catalog::ProductRepository;
use flash_checkout::config::AppConfig;
use flash_checkout::db::{self, Database};
use flash_checkout::gateway::{self, state::AppState};
use flash_checkout::hold::HoldManager;
use flash_checkout::jobs;
use flash_checkout::logging::init_logging;
use flash_checkout::order::OrderManager;
use flash_checkout::sweeper::ExpirySweeper;
use flash_checkout::webhook::WebhookSettlement;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::from_file(&path)?,
        None => AppConfig::from_env(),
    };

    let _log_guard = init_logging(&config.logging);
    tracing::info!(port = config.server.port, "starting flash_checkout");

    let database = Database::connect(&config.database.url, config.database.max_connections).await?;
    db::init_schema(database.pool()).await?;

    let cache = StockCache::new(config.checkout.cache_ttl());
    let locks = AdvisoryLocks::new();

    let holds = HoldManager::new(
        database.pool().clone(),
        cache.clone(),
        locks.clone(),
        config.checkout.clone(),
    );
    let orders = OrderManager::new(database.pool().clone(), holds.clone());
    let settlement = WebhookSettlement::new(database.pool().clone(), orders.clone());
    let products = ProductRepository::new(database.pool().clone());

    let (release_queue, release_worker) =
        jobs::release_channel(holds.clone(), config.checkout.clone());
    tokio::spawn(release_worker.run());

    let sweeper = ExpirySweeper::new(
        database.pool().clone(),
        release_queue,
        config.checkout.sweep_interval(),
    );
    tokio::spawn(async move { sweeper.run().await });

    let state = Arc::new(AppState {
        db: database,
        products,
        cache,
        holds,
        orders,
        settlement,
    });

    gateway::run_server(config.server.port, state).await
}
