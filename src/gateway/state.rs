use crate::cache::StockCache;
use crate::catalog::ProductRepository;
use crate::db::Database;
use crate::hold::HoldManager;
use crate::order::OrderManager;
use crate::webhook::WebhookSettlement;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub products: ProductRepository,
    pub cache: StockCache,
    pub holds: HoldManager,
    pub orders: OrderManager,
    pub settlement: WebhookSettlement,
}
