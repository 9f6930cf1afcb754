use axum::extract::{Multipart, State};
use axum::{Json, Router};
use axum::routing::{get, post};
use tracing::{info, error, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ImportRequest, ImportSession, ImportSummary};
use crate::services::csv_import_service;
use crate::services::import_templates::{built_in_templates, ImportTemplate};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/templates", get(list_templates))
        .route("/upload", post(upload_csv))
        .route("/import", post(import_rows))
}

pub async fn list_templates() -> Json<Vec<ImportTemplate>> {
    info!("GET /importer/templates - Listing import templates");
    Json(built_in_templates())
}

#[derive(Default)]
struct UploadForm {
    file: Option<Vec<u8>>,
    template: Option<String>,
    account_holder_id: Option<String>,
    exchange: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read uploaded file: {}", e)))?;
                form.file = Some(bytes.to_vec());
            }
            "template" | "account_holder_id" | "exchange" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read field {}: {}", name, e)))?;
                let value = Some(value.trim().to_string()).filter(|v| !v.is_empty());
                match name.as_str() {
                    "template" => form.template = value,
                    "account_holder_id" => form.account_holder_id = value,
                    _ => form.exchange = value,
                }
            }
            other => warn!("Ignoring unexpected upload field {}", other),
        }
    }
    Ok(form)
}

pub async fn upload_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImportSession>, AppError> {
    info!("POST /importer/upload - Receiving brokerage CSV");
    let form = read_form(multipart).await?;

    let content = form.file.ok_or_else(|| AppError::validation("No file uploaded"))?;
    let template = form.template.unwrap_or_else(|| "generic".to_string());
    let holder = form
        .account_holder_id
        .ok_or_else(|| AppError::validation("account_holder_id is required"))?;
    let holder = Uuid::parse_str(&holder)
        .map_err(|_| AppError::validation(format!("Invalid account_holder_id: {}", holder)))?;

    let session = csv_import_service::upload(
        &state.pool,
        &state.import_sessions,
        holder,
        &template,
        form.exchange.as_deref(),
        &content,
    )
    .await
    .map_err(|e| {
        error!("Failed to stage CSV import: {}", e);
        e
    })?;
    Ok(Json(session))
}

pub async fn import_rows(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<Json<ImportSummary>, AppError> {
    info!("POST /importer/import - Committing session {}", request.session_id);
    let summary = csv_import_service::commit(&state.pool, &state.import_sessions, request).await
        .map_err(|e| {
            error!("Failed to commit import: {}", e);
            e
        })?;
    Ok(Json(summary))
}
