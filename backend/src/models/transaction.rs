use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "BUY"),
            TransactionType::Sell => write!(f, "SELL"),
            TransactionType::Dividend => write!(f, "DIVIDEND"),
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TransactionType::Buy),
            "SELL" => Ok(TransactionType::Sell),
            "DIVIDEND" => Ok(TransactionType::Dividend),
            other => Err(format!("Invalid transaction type: {}", other)),
        }
    }
}

/// A ledger row. BUY rows double as lots and carry `original_quantity` and
/// `quantity_remaining`; SELL rows point at the lot they consumed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub exchange: String,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub price: f64,
    pub transaction_date: NaiveDate,
    pub original_quantity: Option<f64>,
    pub quantity_remaining: Option<f64>,
    pub parent_buy_id: Option<Uuid>,
    pub limit_price_up: Option<f64>,
    pub limit_price_down: Option<f64>,
    pub limit_up_expiration: Option<NaiveDate>,
    pub limit_down_expiration: Option<NaiveDate>,
    pub advice_source_id: Option<Uuid>,
    pub linked_journal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn remaining(&self) -> f64 {
        self.quantity_remaining.unwrap_or(0.0)
    }
}

/// One slice of a selective multi-lot sell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotAllocation {
    pub parent_buy_id: Uuid,
    pub quantity_to_sell: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransaction {
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub exchange: String,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub price: f64,
    pub transaction_date: NaiveDate,
    pub parent_buy_id: Option<Uuid>,
    pub lots: Option<Vec<LotAllocation>>,
    pub limit_price_up: Option<f64>,
    pub limit_price_down: Option<f64>,
    pub limit_up_expiration: Option<NaiveDate>,
    pub limit_down_expiration: Option<NaiveDate>,
    pub advice_source_id: Option<Uuid>,
    pub linked_journal_id: Option<Uuid>,
}

/// Full replacement of the editable fields; the ticker, holder and type are fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTransaction {
    pub exchange: String,
    pub quantity: f64,
    pub price: f64,
    pub transaction_date: NaiveDate,
    pub limit_price_up: Option<f64>,
    pub limit_price_down: Option<f64>,
    pub limit_up_expiration: Option<NaiveDate>,
    pub limit_down_expiration: Option<NaiveDate>,
    pub advice_source_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    pub holder: Option<Uuid>,
    pub ticker: Option<String>,
}

/// Row handed to the insert query; built by the lot service.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_holder_id: Uuid,
    pub ticker: String,
    pub exchange: String,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub price: f64,
    pub transaction_date: NaiveDate,
    pub original_quantity: Option<f64>,
    pub quantity_remaining: Option<f64>,
    pub parent_buy_id: Option<Uuid>,
    pub limit_price_up: Option<f64>,
    pub limit_price_down: Option<f64>,
    pub limit_up_expiration: Option<NaiveDate>,
    pub limit_down_expiration: Option<NaiveDate>,
    pub advice_source_id: Option<Uuid>,
    pub linked_journal_id: Option<Uuid>,
}

impl NewTransaction {
    pub fn buy(
        account_holder_id: Uuid,
        ticker: String,
        exchange: String,
        quantity: f64,
        price: f64,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            account_holder_id,
            ticker,
            exchange,
            transaction_type: TransactionType::Buy,
            quantity,
            price,
            transaction_date,
            original_quantity: Some(quantity),
            quantity_remaining: Some(quantity),
            parent_buy_id: None,
            limit_price_up: None,
            limit_price_down: None,
            limit_up_expiration: None,
            limit_down_expiration: None,
            advice_source_id: None,
            linked_journal_id: None,
        }
    }

    pub fn dividend(
        account_holder_id: Uuid,
        ticker: String,
        exchange: String,
        quantity: f64,
        price: f64,
        transaction_date: NaiveDate,
    ) -> Self {
        Self {
            transaction_type: TransactionType::Dividend,
            original_quantity: None,
            quantity_remaining: None,
            ..Self::buy(account_holder_id, ticker, exchange, quantity, price, transaction_date)
        }
    }

    pub fn sell(parent: &Transaction, quantity: f64, price: f64, transaction_date: NaiveDate) -> Self {
        Self {
            account_holder_id: parent.account_holder_id,
            ticker: parent.ticker.clone(),
            exchange: parent.exchange.clone(),
            transaction_type: TransactionType::Sell,
            quantity,
            price,
            transaction_date,
            original_quantity: None,
            quantity_remaining: None,
            parent_buy_id: Some(parent.id),
            limit_price_up: None,
            limit_price_down: None,
            limit_up_expiration: None,
            limit_down_expiration: None,
            advice_source_id: parent.advice_source_id,
            linked_journal_id: None,
        }
    }
}

/// A SELL together with the P/L it realized against its parent lot.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleWithPl {
    pub id: Uuid,
    pub quantity: f64,
    pub price: f64,
    pub transaction_date: NaiveDate,
    pub parent_buy_price: f64,
    pub realized_pl: f64,
}

/// Response for create: a BUY yields one row, a selective SELL yields one row per lot.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedTransactions {
    pub transactions: Vec<Transaction>,
}
