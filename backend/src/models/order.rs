use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    BuyLimit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Active,
    Filled,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingOrder {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub exchange: String,
    pub order_type: OrderType,
    pub limit_price: f64,
    pub quantity: f64,
    pub created_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub advice_source_id: Option<Uuid>,
}

impl PendingOrder {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date.map_or(false, |exp| exp < today)
    }

    /// A buy limit is met once the market trades at or below it.
    pub fn is_triggered_by(&self, price: f64) -> bool {
        match self.order_type {
            OrderType::BuyLimit => price <= self.limit_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePendingOrder {
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub exchange: String,
    pub order_type: Option<OrderType>,
    pub limit_price: f64,
    pub quantity: f64,
    pub created_date: NaiveDate,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub advice_source_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePendingOrder {
    pub limit_price: f64,
    pub quantity: f64,
    pub expiration_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HolderQuery {
    pub holder: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Unread,
    Dismissed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub pending_order_id: Option<Uuid>,
    pub message: String,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}
