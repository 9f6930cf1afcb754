use axum::extract::{Path, Query, State};
use axum::{Json, Router};
use axum::routing::{get, post, put};
use http::StatusCode;
use tracing::{info, error};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{CreatePendingOrder, HolderQuery, Notification, PendingOrder, UpdatePendingOrder};
use crate::services::order_service;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(list_pending).post(create_pending))
        .route("/pending/:id", put(update_pending))
        .route("/pending/:id/cancel", post(cancel_pending))
        .route("/pending/:id/fill", post(fill_pending))
        .route("/notifications", get(list_notifications))
        .route("/notifications/:id/dismiss", put(dismiss_notification))
}

pub async fn list_pending(
    State(state): State<AppState>,
    Query(query): Query<HolderQuery>,
) -> Result<Json<Vec<PendingOrder>>, AppError> {
    info!("GET /orders/pending - Listing active orders");
    let orders = order_service::list_active(&state.pool, query.holder).await
        .map_err(|e| {
            error!("Failed to list pending orders: {}", e);
            e
        })?;
    Ok(Json(orders))
}

pub async fn create_pending(
    State(state): State<AppState>,
    Json(data): Json<CreatePendingOrder>,
) -> Result<(StatusCode, Json<PendingOrder>), AppError> {
    info!("POST /orders/pending - Creating limit order for {} at {}", data.ticker, data.limit_price);
    let order = order_service::create(&state.pool, data).await
        .map_err(|e| {
            error!("Failed to create pending order: {}", e);
            e
        })?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_pending(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdatePendingOrder>,
) -> Result<Json<PendingOrder>, AppError> {
    info!("PUT /orders/pending/{} - Updating order", id);
    let order = order_service::update(&state.pool, id, data).await
        .map_err(|e| {
            error!("Failed to update pending order {}: {}", id, e);
            e
        })?;
    Ok(Json(order))
}

pub async fn cancel_pending(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PendingOrder>, AppError> {
    info!("POST /orders/pending/{}/cancel - Cancelling order", id);
    let order = order_service::cancel(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to cancel pending order {}: {}", id, e);
            e
        })?;
    Ok(Json(order))
}

pub async fn fill_pending(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PendingOrder>, AppError> {
    info!("POST /orders/pending/{}/fill - Marking order filled", id);
    let order = order_service::fill(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to fill pending order {}: {}", id, e);
            e
        })?;
    Ok(Json(order))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<HolderQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    info!("GET /orders/notifications - Listing unread notifications");
    let notifications = order_service::list_notifications(&state.pool, query.holder).await
        .map_err(|e| {
            error!("Failed to list notifications: {}", e);
            e
        })?;
    Ok(Json(notifications))
}

pub async fn dismiss_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    info!("PUT /orders/notifications/{}/dismiss - Dismissing notification", id);
    let notification = order_service::dismiss_notification(&state.pool, id).await
        .map_err(|e| {
            error!("Failed to dismiss notification {}: {}", id, e);
            e
        })?;
    Ok(Json(notification))
}
