use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::{get, post, put};
use http::StatusCode;
use tracing::{info, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AdviceSource, SaveAdviceSource, SaveSourceNote, SourceDetails, SourceNote, SourceQuery};
use crate::services::source_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sources).post(create_source))
        .route("/:id", get(get_source).put(update_source).delete(delete_source))
        .route("/:id/details", get(get_source_details))
        .route("/:id/notes", post(add_note))
        .route("/:id/notes/:note_id", put(update_note).delete(delete_note))
}

pub async fn list_sources(
    State(state): State<AppState>,
    Query(query): Query<SourceQuery>,
) -> Result<Json<Vec<AdviceSource>>, AppError> {
    info!("GET /sources - Listing advice sources");
    let sources = source_service::list(&state.pool, query.holder).await
        .map_err(|e| {
            error!("Failed to list advice sources: {}", e);
            e
        })?;
    Ok(Json(sources))
}

pub async fn create_source(
    State(state): State<AppState>,
    Json(data): Json<SaveAdviceSource>,
) -> Result<(StatusCode, Json<AdviceSource>), AppError> {
    info!("POST /sources - Creating advice source {}", data.name);
    let source = source_service::create(&state.pool, data).await
        .map_err(|e| {
            error!("Failed to create advice source: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(source)))
}

pub async fn get_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdviceSource>, AppError> {
    info!("GET /sources/{} - Fetching advice source", id);
    let source = source_service::fetch_one(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to fetch advice source {}: {}", id, e);
            e
        })?;
    Ok(Json(source))
}

pub async fn update_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<SaveAdviceSource>,
) -> Result<Json<AdviceSource>, AppError> {
    info!("PUT /sources/{} - Updating advice source", id);
    let source = source_service::update(&state.pool, id, data).await
        .map_err(|e| {
            error!("Failed to update advice source {}: {}", id, e);
            e
        })?;
    Ok(Json(source))
}

pub async fn delete_source(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /sources/{} - Deleting advice source", id);
    source_service::delete(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to delete advice source {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_source_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SourceDetails>, AppError> {
    info!("GET /sources/{}/details - Loading source details", id);
    let details = source_service::details(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to load details for source {}: {}", id, e);
            e
        })?;
    Ok(Json(details))
}

pub async fn add_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<SaveSourceNote>,
) -> Result<(StatusCode, Json<SourceNote>), AppError> {
    info!("POST /sources/{}/notes - Adding note", id);
    let note = source_service::add_note(&state.pool, id, data).await
        .map_err(|e| {
            error!("Failed to add note to source {}: {}", id, e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(Uuid, Uuid)>,
    Json(data): Json<SaveSourceNote>,
) -> Result<Json<SourceNote>, AppError> {
    info!("PUT /sources/{}/notes/{} - Updating note", id, note_id);
    let note = source_service::update_note(&state.pool, id, note_id, data).await
        .map_err(|e| {
            error!("Failed to update note {}: {}", note_id, e);
            e
        })?;
    Ok(Json(note))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path((id, note_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /sources/{}/notes/{} - Deleting note", id, note_id);
    source_service::delete_note(&state.pool, id, note_id).await
        .map_err(|e| {
            error!("Failed to delete note {}: {}", note_id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
