use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::price::PriceValue;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchlistStatus {
    Active,
    Archived,
}

/// A trade idea: a ticker plus the entry/exit guideline an advice source gave.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WatchlistItem {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub advice_source_id: Option<Uuid>,
    pub rec_entry_low: Option<f64>,
    pub rec_entry_high: Option<f64>,
    pub rec_tp1: Option<f64>,
    pub rec_tp2: Option<f64>,
    pub rec_stop_loss: Option<f64>,
    pub notes: Option<String>,
    pub status: WatchlistStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveWatchlistItem {
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub advice_source_id: Option<Uuid>,
    pub rec_entry_low: Option<f64>,
    pub rec_entry_high: Option<f64>,
    pub rec_tp1: Option<f64>,
    pub rec_tp2: Option<f64>,
    pub rec_stop_loss: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchlistQuery {
    pub holder: Option<Uuid>,
    pub status: Option<WatchlistStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistItemView {
    #[serde(flatten)]
    pub item: WatchlistItem,
    pub current_price: Option<PriceValue>,
    pub in_entry_zone: Option<bool>,
}

impl WatchlistItemView {
    pub fn new(item: WatchlistItem, current_price: Option<PriceValue>) -> Self {
        let in_entry_zone = current_price.and_then(|p| p.as_f64()).and_then(|price| {
            match (item.rec_entry_low, item.rec_entry_high) {
                (Some(low), Some(high)) => Some(price >= low && price <= high),
                (None, Some(high)) => Some(price <= high),
                (Some(low), None) => Some(price >= low),
                (None, None) => None,
            }
        });
        Self { item, current_price, in_entry_zone }
    }
}
