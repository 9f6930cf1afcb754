use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::{PriceValue, TransactionType};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub holder: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyPerformance {
    pub date: NaiveDate,
    pub previous_value: f64,
    pub current_value: f64,
    pub daily_change: f64,
    pub daily_change_percent: f64,
}

/// A transaction on the report date, with its lot's buy price when it is a SELL.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DailyTransaction {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub exchange: String,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub price: f64,
    pub transaction_date: NaiveDate,
    pub parent_buy_id: Option<Uuid>,
    pub parent_buy_price: Option<f64>,
    pub realized_pl: Option<f64>,
}

/// A BUY lot reconstructed as it stood at the end of a given day.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LotAsOf {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub exchange: String,
    pub price: f64,
    pub transaction_date: NaiveDate,
    pub quantity_remaining: f64,
    pub limit_price_up: Option<f64>,
    pub limit_price_down: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionsReport {
    pub date: NaiveDate,
    pub daily_transactions: Vec<DailyTransaction>,
    pub end_of_day_positions: Vec<LotAsOf>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ExchangeRealizedPl {
    pub exchange: String,
    pub realized_pl: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealizedPlSummary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_realized_pl: f64,
    pub by_exchange: Vec<ExchangeRealizedPl>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealizedPlRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub holder: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioOverviewRow {
    pub ticker: String,
    pub exchange: String,
    pub lot_count: usize,
    pub total_quantity: f64,
    pub weighted_average_cost: f64,
    pub total_cost: f64,
    pub current_price: PriceValue,
    pub market_value: Option<f64>,
    pub unrealized_pl: Option<f64>,
    pub unrealized_pl_percent: Option<f64>,
}
