use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::watchlist_queries;
use crate::errors::AppError;
use crate::models::{SaveWatchlistItem, WatchlistItem, WatchlistItemView, WatchlistQuery, WatchlistStatus};
use crate::services::price_service::{priority, PriceService};
use crate::utils::normalize_ticker;

fn validate(input: &SaveWatchlistItem) -> Result<String, AppError> {
    let ticker = normalize_ticker(&input.ticker);
    if ticker.is_empty() {
        return Err(AppError::validation("Ticker cannot be empty"));
    }
    let prices = [
        input.rec_entry_low,
        input.rec_entry_high,
        input.rec_tp1,
        input.rec_tp2,
        input.rec_stop_loss,
    ];
    if prices.iter().flatten().any(|p| *p < 0.0) {
        return Err(AppError::validation("Guideline prices cannot be negative"));
    }
    if let (Some(low), Some(high)) = (input.rec_entry_low, input.rec_entry_high) {
        if low > high {
            return Err(AppError::validation("Entry zone low is above its high"));
        }
    }
    Ok(ticker)
}

/// Lists ideas; ACTIVE ones carry a live price and whether it sits in the entry zone.
pub async fn list(
    pool: &PgPool,
    prices: &Arc<PriceService>,
    query: WatchlistQuery,
) -> Result<Vec<WatchlistItemView>, AppError> {
    let items = watchlist_queries::fetch_all(pool, query.holder, query.status).await?;

    let tickers: Vec<String> = items
        .iter()
        .filter(|i| i.status == WatchlistStatus::Active)
        .map(|i| i.ticker.clone())
        .collect();
    let quotes = prices.get_prices(&tickers, priority::WATCHLIST).await;

    Ok(items
        .into_iter()
        .map(|item| {
            let price = match item.status {
                WatchlistStatus::Active => quotes.get(&item.ticker).map(|q| q.price),
                WatchlistStatus::Archived => None,
            };
            WatchlistItemView::new(item, price)
        })
        .collect())
}

pub async fn create(pool: &PgPool, input: SaveWatchlistItem) -> Result<WatchlistItem, AppError> {
    let ticker = validate(&input)?;
    Ok(watchlist_queries::create(pool, &input, &ticker).await?)
}

pub async fn update(pool: &PgPool, id: Uuid, input: SaveWatchlistItem) -> Result<WatchlistItem, AppError> {
    let ticker = validate(&input)?;
    watchlist_queries::update(pool, id, &input, &ticker)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Watchlist item {} not found", id)))
}

pub async fn archive(pool: &PgPool, id: Uuid) -> Result<WatchlistItem, AppError> {
    watchlist_queries::archive(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Watchlist item {} not found", id)))
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    match watchlist_queries::delete(pool, id).await? {
        0 => Err(AppError::not_found(format!("Watchlist item {} not found", id))),
        _ => Ok(()),
    }
}
