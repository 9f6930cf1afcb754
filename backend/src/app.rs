use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes::{
    accounts, documents, health, imports, journal, orders, prices, reporting, sources, transactions, watchlist,
};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/transactions", transactions::router())
        .nest("/api/accounts", accounts::router())
        .nest("/api/reporting", reporting::router())
        .nest("/api/orders", orders::router())
        .nest("/api/journal", journal::router())
        .nest("/api/watchlist", watchlist::router())
        .nest("/api/sources", sources::router())
        .nest("/api/documents", documents::router())
        .nest("/api/utility", prices::router())
        .nest("/api/importer", imports::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
