use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::price::PriceValue;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JournalStatus {
    Open,
    Closed,
    Executed,
    Cancelled,
}

impl JournalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JournalStatus::Open)
    }

    /// Only OPEN entries move, and only into a terminal state.
    pub fn can_transition_to(self, next: JournalStatus) -> bool {
        self == JournalStatus::Open && next.is_terminal()
    }
}

impl std::fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JournalStatus::Open => "OPEN",
            JournalStatus::Closed => "CLOSED",
            JournalStatus::Executed => "EXECUTED",
            JournalStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl TradeDirection {
    fn sign(self) -> f64 {
        match self {
            TradeDirection::Buy => 1.0,
            TradeDirection::Sell => -1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub account_holder_id: Uuid,
    pub advice_source_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub ticker: String,
    pub exchange: String,
    pub direction: TradeDirection,
    pub quantity: f64,
    pub entry_price: f64,
    pub target_price: Option<f64>,
    pub target_price_2: Option<f64>,
    pub stop_loss_price: Option<f64>,
    pub status: JournalStatus,
    pub exit_date: Option<NaiveDate>,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<String>,
    pub notes: Option<String>,
    pub linked_trade_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Paper P/L at `price`, signed by trade direction.
    pub fn paper_pl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity * self.direction.sign()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJournalEntry {
    pub account_holder_id: Uuid,
    pub advice_source_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub ticker: String,
    pub exchange: String,
    pub direction: Option<TradeDirection>,
    pub quantity: f64,
    pub entry_price: f64,
    pub target_price: Option<f64>,
    pub target_price_2: Option<f64>,
    pub stop_loss_price: Option<f64>,
    pub notes: Option<String>,
}

/// Editable fields of an OPEN entry. Status changes go through close/execute/cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateJournalEntry {
    pub advice_source_id: Option<Uuid>,
    pub entry_date: NaiveDate,
    pub ticker: String,
    pub exchange: String,
    pub direction: TradeDirection,
    pub quantity: f64,
    pub entry_price: f64,
    pub target_price: Option<f64>,
    pub target_price_2: Option<f64>,
    pub stop_loss_price: Option<f64>,
    pub notes: Option<String>,
    pub status: Option<JournalStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseJournalEntry {
    pub exit_price: f64,
    pub exit_date: NaiveDate,
    pub exit_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecuteJournalEntry {
    pub execution_price: Option<f64>,
    pub execution_date: Option<NaiveDate>,
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalQuery {
    pub holder: Option<Uuid>,
    pub status: Option<JournalStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntryView {
    #[serde(flatten)]
    pub entry: JournalEntry,
    pub current_price: Option<PriceValue>,
    pub unrealized_pl: Option<f64>,
    pub realized_pl: Option<f64>,
}

impl JournalEntryView {
    pub fn new(entry: JournalEntry, current_price: Option<PriceValue>) -> Self {
        let unrealized_pl = match (&entry.status, current_price.and_then(|p| p.as_f64())) {
            (JournalStatus::Open, Some(price)) => Some(entry.paper_pl(price)),
            _ => None,
        };
        let realized_pl = match (&entry.status, entry.exit_price) {
            (JournalStatus::Closed, Some(exit)) => Some(entry.paper_pl(exit)),
            _ => None,
        };
        Self { entry, current_price, unrealized_pl, realized_pl }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutedJournalEntry {
    pub entry: JournalEntry,
    pub transaction_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [JournalStatus; 4] = [
        JournalStatus::Open,
        JournalStatus::Closed,
        JournalStatus::Executed,
        JournalStatus::Cancelled,
    ];

    #[test]
    fn test_open_moves_to_any_terminal_state() {
        assert!(JournalStatus::Open.can_transition_to(JournalStatus::Closed));
        assert!(JournalStatus::Open.can_transition_to(JournalStatus::Executed));
        assert!(JournalStatus::Open.can_transition_to(JournalStatus::Cancelled));
        assert!(!JournalStatus::Open.can_transition_to(JournalStatus::Open));
    }

    #[test]
    fn test_terminal_states_never_move() {
        for from in [JournalStatus::Closed, JournalStatus::Executed, JournalStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {} must be rejected", from, to);
            }
        }
    }

    #[test]
    fn test_status_uses_upper_case_wire_names() {
        assert_eq!(serde_json::to_string(&JournalStatus::Cancelled).unwrap(), "\"CANCELLED\"");
        assert_eq!(JournalStatus::Executed.to_string(), "EXECUTED");
    }
}
