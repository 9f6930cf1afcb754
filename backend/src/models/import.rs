use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TransactionType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImportRowStatus {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Potential Duplicate")]
    PotentialDuplicate,
}

/// A brokerage CSV row after template mapping, before it touches the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub row_index: usize,
    pub transaction_date: NaiveDate,
    pub ticker: String,
    pub exchange: String,
    pub transaction_type: TransactionType,
    pub quantity: f64,
    pub price: f64,
    pub status: ImportRowStatus,
    pub conflict_transaction_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSession {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub template: String,
    pub rows: Vec<ImportRow>,
    pub errors: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportAction {
    Import,
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResolution {
    pub row_index: usize,
    pub action: ImportAction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportRequest {
    pub session_id: Uuid,
    #[serde(default)]
    pub resolutions: Vec<RowResolution>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub buys: usize,
    pub sells: usize,
    pub dividends: usize,
}
