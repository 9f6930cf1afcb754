use std::collections::HashMap;

use axum::extract::State;
use axum::{Json, Router};
use axum::routing::post;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::{BatchPriceRequest, PriceQuote};
use crate::services::price_service::priority;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/prices/batch", post(get_batch_prices))
}

fn clamp_priority(requested: Option<u8>) -> u8 {
    requested
        .unwrap_or(priority::INTERACTIVE)
        .clamp(priority::INTERACTIVE, priority::EOD_CAPTURE)
}

pub async fn get_batch_prices(
    State(state): State<AppState>,
    Json(request): Json<BatchPriceRequest>,
) -> Result<Json<HashMap<String, PriceQuote>>, AppError> {
    let priority = clamp_priority(request.priority);
    info!("POST /utility/prices/batch - {} tickers at priority {}", request.tickers.len(), priority);

    if request.tickers.is_empty() {
        warn!("Batch price request with no tickers");
        return Err(AppError::validation("tickers cannot be empty"));
    }

    let quotes = state.prices.get_prices(&request.tickers, priority).await;
    Ok(Json(quotes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_defaults_and_clamps() {
        assert_eq!(clamp_priority(None), 1);
        assert_eq!(clamp_priority(Some(0)), 1);
        assert_eq!(clamp_priority(Some(5)), 5);
        assert_eq!(clamp_priority(Some(42)), 9);
    }
}
