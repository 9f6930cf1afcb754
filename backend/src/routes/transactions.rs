use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::get;
use http::StatusCode;
use tracing::{info, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    CreateTransaction, CreatedTransactions, SaleWithPl, Transaction, TransactionQuery, UpdateTransaction,
};
use crate::services::transaction_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_transactions).post(create_transaction))
        .route("/:id", get(get_transaction).put(update_transaction).delete(delete_transaction))
        .route("/:id/sales", get(get_sales))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    info!("GET /transactions - Listing transactions (holder: {:?}, ticker: {:?})", query.holder, query.ticker);
    let transactions = transaction_service::list(&state.pool, query).await
        .map_err(|e| {
            error!("Failed to list transactions: {}", e);
            e
        })?;
    Ok(Json(transactions))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    Json(data): Json<CreateTransaction>,
) -> Result<(StatusCode, Json<CreatedTransactions>), AppError> {
    info!("POST /transactions - Creating {} {} x{}", data.transaction_type, data.ticker, data.quantity);
    let created = transaction_service::create(&state.pool, data).await
        .map_err(|e| {
            error!("Failed to create transaction: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    info!("GET /transactions/{} - Fetching transaction", id);
    let transaction = transaction_service::fetch_one(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to fetch transaction {}: {}", id, e);
            e
        })?;
    Ok(Json(transaction))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateTransaction>,
) -> Result<Json<Transaction>, AppError> {
    info!("PUT /transactions/{} - Updating transaction", id);
    let transaction = transaction_service::update(&state.pool, id, data).await
        .map_err(|e| {
            error!("Failed to update transaction {}: {}", id, e);
            e
        })?;
    Ok(Json(transaction))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /transactions/{} - Deleting transaction", id);
    transaction_service::delete(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to delete transaction {}: {}", id, e);
            e
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_sales(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<SaleWithPl>>, AppError> {
    info!("GET /transactions/{}/sales - Fetching sales against lot", id);
    let sales = transaction_service::sales(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to fetch sales for {}: {}", id, e);
            e
        })?;
    Ok(Json(sales))
}
