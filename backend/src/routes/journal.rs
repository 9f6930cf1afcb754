use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::{get, post};
use http::StatusCode;
use tracing::{info, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CloseJournalEntry, CreateJournalEntry, ExecuteJournalEntry, ExecutedJournalEntry, JournalEntry,
    JournalEntryView, JournalQuery, UpdateJournalEntry,
};
use crate::services::journal_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route("/:id", get(get_entry).put(update_entry).delete(delete_entry))
        .route("/:id/close", post(close_entry))
        .route("/:id/execute", post(execute_entry))
        .route("/:id/cancel", post(cancel_entry))
}

pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<JournalQuery>,
) -> Result<Json<Vec<JournalEntryView>>, AppError> {
    info!("GET /journal - Listing journal entries (status: {:?})", query.status);
    let entries = journal_service::list(&state.pool, &state.prices, query).await
        .map_err(|e| {
            error!("Failed to list journal entries: {}", e);
            e
        })?;
    Ok(Json(entries))
}

pub async fn create_entry(
    State(state): State<AppState>,
    Json(data): Json<CreateJournalEntry>,
) -> Result<(StatusCode, Json<JournalEntry>), AppError> {
    info!("POST /journal - Recording trade idea for {}", data.ticker);
    let entry = journal_service::create(&state.pool, data).await
        .map_err(|e| {
            error!("Failed to create journal entry: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JournalEntryView>, AppError> {
    info!("GET /journal/{} - Fetching journal entry", id);
    let entry = journal_service::fetch_one(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to fetch journal entry {}: {}", id, e);
            e
        })?;
    Ok(Json(entry))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateJournalEntry>,
) -> Result<Json<JournalEntry>, AppError> {
    info!("PUT /journal/{} - Updating journal entry", id);
    let entry = journal_service::update(&state.pool, id, data).await
        .map_err(|e| {
            error!("Failed to update journal entry {}: {}", id, e);
            e
        })?;
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /journal/{} - Deleting journal entry", id);
    journal_service::delete(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to delete journal entry {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn close_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<CloseJournalEntry>,
) -> Result<Json<JournalEntryView>, AppError> {
    info!("POST /journal/{}/close - Closing at {}", id, data.exit_price);
    let entry = journal_service::close(&state.pool, id, data).await
        .map_err(|e| {
            error!("Failed to close journal entry {}: {}", id, e);
            e
        })?;
    Ok(Json(entry))
}

/// The body is optional; missing fields fall back to the entry's own values.
pub async fn execute_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    data: Option<Json<ExecuteJournalEntry>>,
) -> Result<Json<ExecutedJournalEntry>, AppError> {
    info!("POST /journal/{}/execute - Executing trade idea", id);
    let input = data.map(|Json(d)| d).unwrap_or_default();
    let executed = journal_service::execute(&state.pool, id, input).await
        .map_err(|e| {
            error!("Failed to execute journal entry {}: {}", id, e);
            e
        })?;
    Ok(Json(executed))
}

pub async fn cancel_entry(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JournalEntry>, AppError> {
    info!("POST /journal/{}/cancel - Cancelling journal entry", id);
    let entry = journal_service::cancel(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to cancel journal entry {}: {}", id, e);
            e
        })?;
    Ok(Json(entry))
}
