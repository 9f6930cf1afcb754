use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    service: &'static str,
    price_provider: Option<&'static str>,
    pending_imports: usize,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

/// Liveness only: the database is not queried.
async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    info!("GET /health - Portfolio tracker health check");
    Json(HealthStatus {
        status: "OK",
        service: env!("CARGO_PKG_NAME"),
        price_provider: state.prices.provider_name(),
        pending_imports: state.import_sessions.len(),
    })
}
