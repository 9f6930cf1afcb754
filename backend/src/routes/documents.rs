use axum::extract::{Path, State};
use axum::{Json, Router};
use axum::routing::{delete, post};
use http::StatusCode;
use tracing::{info, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreateDocument, Document};
use crate::services::source_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_document))
        .route("/:id", delete(delete_document))
}

pub async fn create_document(
    State(state): State<AppState>,
    Json(data): Json<CreateDocument>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    info!("POST /documents - Linking document {}", data.title);
    let document = source_service::create_document(&state.pool, data).await
        .map_err(|e| {
            error!("Failed to create document: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /documents/{} - Deleting document", id);
    source_service::delete_document(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to delete document {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
