use std::sync::Arc;
use sqlx::PgPool;
use crate::services::csv_import_service::ImportSessions;
use crate::services::price_service::PriceService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub prices: Arc<PriceService>,
    pub import_sessions: Arc<ImportSessions>,
}
