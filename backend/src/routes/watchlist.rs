use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::{get, post, put};
use http::StatusCode;
use tracing::{info, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{SaveWatchlistItem, WatchlistItem, WatchlistItemView, WatchlistQuery};
use crate::services::watchlist_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:id", put(update_item).delete(delete_item))
        .route("/:id/archive", post(archive_item))
}

pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<WatchlistQuery>,
) -> Result<Json<Vec<WatchlistItemView>>, AppError> {
    info!("GET /watchlist - Listing watchlist (status: {:?})", query.status);
    let items = watchlist_service::list(&state.pool, &state.prices, query).await
        .map_err(|e| {
            error!("Failed to list watchlist: {}", e);
            e
        })?;
    Ok(Json(items))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(data): Json<SaveWatchlistItem>,
) -> Result<(StatusCode, Json<WatchlistItem>), AppError> {
    info!("POST /watchlist - Watching {}", data.ticker);
    let item = watchlist_service::create(&state.pool, data).await
        .map_err(|e| {
            error!("Failed to create watchlist item: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<SaveWatchlistItem>,
) -> Result<Json<WatchlistItem>, AppError> {
    info!("PUT /watchlist/{} - Updating watchlist item", id);
    let item = watchlist_service::update(&state.pool, id, data).await
        .map_err(|e| {
            error!("Failed to update watchlist item {}: {}", id, e);
            e
        })?;
    Ok(Json(item))
}

pub async fn archive_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WatchlistItem>, AppError> {
    info!("POST /watchlist/{}/archive - Archiving watchlist item", id);
    let item = watchlist_service::archive(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to archive watchlist item {}: {}", id, e);
            e
        })?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /watchlist/{} - Deleting watchlist item", id);
    watchlist_service::delete(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to delete watchlist item {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
