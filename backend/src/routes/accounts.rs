use axum::extract::{Path, State};
use axum::{Json, Router};
use axum::routing::{get, put};
use http::StatusCode;
use tracing::{info, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AccountHolder, Exchange, SaveAccountHolder, SaveExchange};
use crate::services::account_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/holders", get(list_holders).post(create_holder))
        .route("/holders/:id", put(rename_holder).delete(delete_holder))
        .route("/exchanges", get(list_exchanges).post(create_exchange))
        .route("/exchanges/:id", put(rename_exchange).delete(delete_exchange))
}

pub async fn list_holders(State(state): State<AppState>) -> Result<Json<Vec<AccountHolder>>, AppError> {
    info!("GET /accounts/holders - Listing account holders");
    let holders = account_service::list_holders(&state.pool).await
        .map_err(|e| {
            error!("Failed to list account holders: {}", e);
            e
        })?;
    Ok(Json(holders))
}

pub async fn create_holder(
    State(state): State<AppState>,
    Json(data): Json<SaveAccountHolder>,
) -> Result<(StatusCode, Json<AccountHolder>), AppError> {
    info!("POST /accounts/holders - Creating account holder {}", data.name);
    let holder = account_service::create_holder(&state.pool, &data.name).await
        .map_err(|e| {
            error!("Failed to create account holder: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(holder)))
}

pub async fn rename_holder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<SaveAccountHolder>,
) -> Result<Json<AccountHolder>, AppError> {
    info!("PUT /accounts/holders/{} - Renaming account holder", id);
    let holder = account_service::rename_holder(&state.pool, id, &data.name).await
        .map_err(|e| {
            error!("Failed to rename account holder {}: {}", id, e);
            e
        })?;
    Ok(Json(holder))
}

pub async fn delete_holder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /accounts/holders/{} - Deleting account holder", id);
    account_service::delete_holder(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to delete account holder {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_exchanges(State(state): State<AppState>) -> Result<Json<Vec<Exchange>>, AppError> {
    info!("GET /accounts/exchanges - Listing exchanges");
    let exchanges = account_service::list_exchanges(&state.pool).await
        .map_err(|e| {
            error!("Failed to list exchanges: {}", e);
            e
        })?;
    Ok(Json(exchanges))
}

pub async fn create_exchange(
    State(state): State<AppState>,
    Json(data): Json<SaveExchange>,
) -> Result<(StatusCode, Json<Exchange>), AppError> {
    info!("POST /accounts/exchanges - Creating exchange {}", data.name);
    let exchange = account_service::create_exchange(&state.pool, &data.name).await
        .map_err(|e| {
            error!("Failed to create exchange: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(exchange)))
}

pub async fn rename_exchange(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<SaveExchange>,
) -> Result<Json<Exchange>, AppError> {
    info!("PUT /accounts/exchanges/{} - Renaming exchange", id);
    let exchange = account_service::rename_exchange(&state.pool, id, &data.name).await
        .map_err(|e| {
            error!("Failed to rename exchange {}: {}", id, e);
            e
        })?;
    Ok(Json(exchange))
}

pub async fn delete_exchange(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /accounts/exchanges/{} - Deleting exchange", id);
    account_service::delete_exchange(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to delete exchange {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}
