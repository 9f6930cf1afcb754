use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::order_queries;
use crate::domain;
use crate::errors::AppError;
use crate::models::{CreatePendingOrder, Notification, OrderStatus, PendingOrder, UpdatePendingOrder};
use crate::utils::normalize_ticker;

fn order_not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("Active pending order {} not found", id))
}

pub async fn list_active(pool: &PgPool, holder: Option<Uuid>) -> Result<Vec<PendingOrder>, AppError> {
    Ok(order_queries::fetch_active(pool, holder).await?)
}

pub async fn create(pool: &PgPool, input: CreatePendingOrder) -> Result<PendingOrder, AppError> {
    let ticker = normalize_ticker(&input.ticker);
    if ticker.is_empty() {
        return Err(AppError::validation("Ticker cannot be empty"));
    }
    domain::validate_trade_amounts(input.quantity, input.limit_price)?;
    if let Some(expiration) = input.expiration_date {
        if expiration < input.created_date {
            return Err(AppError::validation("Expiration date is before the order date"));
        }
    }

    let order = order_queries::create(pool, &input, &ticker).await?;
    info!("🎯 Pending BUY LIMIT {} x {} @ {}", order.ticker, order.quantity, order.limit_price);
    Ok(order)
}

pub async fn update(pool: &PgPool, id: Uuid, input: UpdatePendingOrder) -> Result<PendingOrder, AppError> {
    domain::validate_trade_amounts(input.quantity, input.limit_price)?;
    order_queries::update(pool, id, &input)
        .await?
        .ok_or_else(|| order_not_found(id))
}

pub async fn cancel(pool: &PgPool, id: Uuid) -> Result<PendingOrder, AppError> {
    order_queries::set_status(pool, id, OrderStatus::Cancelled)
        .await?
        .ok_or_else(|| order_not_found(id))
}

pub async fn fill(pool: &PgPool, id: Uuid) -> Result<PendingOrder, AppError> {
    order_queries::set_status(pool, id, OrderStatus::Filled)
        .await?
        .ok_or_else(|| order_not_found(id))
}

pub async fn list_notifications(pool: &PgPool, holder: Option<Uuid>) -> Result<Vec<Notification>, AppError> {
    Ok(order_queries::fetch_unread_notifications(pool, holder).await?)
}

pub async fn dismiss_notification(pool: &PgPool, id: Uuid) -> Result<Notification, AppError> {
    order_queries::dismiss_notification(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Notification {} not found", id)))
}
