use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::db::journal_queries;
use crate::domain;
use crate::errors::AppError;
use crate::models::{
    CloseJournalEntry, CreateJournalEntry, ExecuteJournalEntry, ExecutedJournalEntry, JournalEntry,
    JournalEntryView, JournalQuery, JournalStatus, NewTransaction, TradeDirection, UpdateJournalEntry,
};
use crate::services::price_service::{priority, PriceService};
use crate::services::transaction_service;
use crate::utils::{normalize_exchange, normalize_ticker};

fn validate_fields(ticker: &str, quantity: f64, entry_price: f64) -> Result<(), AppError> {
    if ticker.is_empty() {
        return Err(AppError::validation("Ticker cannot be empty"));
    }
    domain::validate_trade_amounts(quantity, entry_price)?;
    Ok(())
}

fn ensure_transition(entry: &JournalEntry, next: JournalStatus) -> Result<(), AppError> {
    if entry.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Cannot move journal entry from {} to {}",
            entry.status, next
        )))
    }
}

async fn lock_entry(conn: &mut sqlx::PgConnection, id: Uuid) -> Result<JournalEntry, AppError> {
    journal_queries::fetch_one_for_update(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Journal entry {} not found", id)))
}

pub async fn create(pool: &PgPool, input: CreateJournalEntry) -> Result<JournalEntry, AppError> {
    let ticker = normalize_ticker(&input.ticker);
    validate_fields(&ticker, input.quantity, input.entry_price)?;
    let entry = journal_queries::create(pool, &input, &ticker).await?;
    info!("📝 Opened journal entry {} for {}", entry.id, entry.ticker);
    Ok(entry)
}

/// Lists entries; OPEN ones carry a live price and paper P/L.
pub async fn list(
    pool: &PgPool,
    prices: &Arc<PriceService>,
    query: JournalQuery,
) -> Result<Vec<JournalEntryView>, AppError> {
    let entries = journal_queries::fetch_all(pool, query.holder, query.status).await?;

    let open_tickers: Vec<String> = entries
        .iter()
        .filter(|e| e.status == JournalStatus::Open)
        .map(|e| e.ticker.clone())
        .collect();
    let quotes = prices.get_prices(&open_tickers, priority::JOURNAL).await;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let price = match entry.status {
                JournalStatus::Open => quotes.get(&entry.ticker).map(|q| q.price),
                _ => None,
            };
            JournalEntryView::new(entry, price)
        })
        .collect())
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<JournalEntryView, AppError> {
    let entry = journal_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Journal entry {} not found", id)))?;
    Ok(JournalEntryView::new(entry, None))
}

pub async fn update(pool: &PgPool, id: Uuid, input: UpdateJournalEntry) -> Result<JournalEntry, AppError> {
    let ticker = normalize_ticker(&input.ticker);
    validate_fields(&ticker, input.quantity, input.entry_price)?;

    let mut tx = pool.begin().await?;
    let entry = lock_entry(&mut tx, id).await?;
    if entry.status != JournalStatus::Open {
        return Err(AppError::validation(format!(
            "Only OPEN journal entries can be edited, this one is {}",
            entry.status
        )));
    }
    if let Some(status) = input.status {
        if status != JournalStatus::Open {
            return Err(AppError::validation(
                "Use close, execute or cancel to change a journal entry's status",
            ));
        }
    }

    let updated = journal_queries::update(&mut *tx, id, &input, &ticker)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Journal entry {} not found", id)))?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    match journal_queries::delete(pool, id).await? {
        0 => Err(AppError::not_found(format!("Journal entry {} not found", id))),
        _ => Ok(()),
    }
}

/// OPEN → CLOSED; the view carries the realized paper P/L.
pub async fn close(pool: &PgPool, id: Uuid, input: CloseJournalEntry) -> Result<JournalEntryView, AppError> {
    if !(input.exit_price >= 0.0) {
        return Err(AppError::validation("Exit price cannot be negative"));
    }

    let mut tx = pool.begin().await?;
    let entry = lock_entry(&mut tx, id).await?;
    ensure_transition(&entry, JournalStatus::Closed)?;
    if input.exit_date < entry.entry_date {
        return Err(AppError::validation("Exit date cannot be before the entry date"));
    }

    let closed = journal_queries::close(
        &mut *tx,
        id,
        input.exit_price,
        input.exit_date,
        input.exit_reason.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found(format!("Journal entry {} not found", id)))?;
    tx.commit().await?;

    let view = JournalEntryView::new(closed, None);
    info!(
        "📕 Closed journal entry {} ({}) with paper P/L {:?}",
        id, view.entry.ticker, view.realized_pl
    );
    Ok(view)
}

/// OPEN → EXECUTED: turns the paper trade into a real BUY lot.
pub async fn execute(
    pool: &PgPool,
    id: Uuid,
    input: ExecuteJournalEntry,
) -> Result<ExecutedJournalEntry, AppError> {
    let mut tx = pool.begin().await?;
    let entry = lock_entry(&mut tx, id).await?;
    ensure_transition(&entry, JournalStatus::Executed)?;
    if entry.direction != TradeDirection::Buy {
        return Err(AppError::validation("Only BUY journal entries can be executed into a lot"));
    }

    let price = input.execution_price.unwrap_or(entry.entry_price);
    let quantity = input.quantity.unwrap_or(entry.quantity);
    let date = input.execution_date.unwrap_or(entry.entry_date);
    domain::validate_trade_amounts(quantity, price)?;

    let new = NewTransaction {
        advice_source_id: entry.advice_source_id,
        linked_journal_id: Some(entry.id),
        ..NewTransaction::buy(
            entry.account_holder_id,
            entry.ticker.clone(),
            normalize_exchange(&entry.exchange),
            quantity,
            price,
            date,
        )
    };
    let lot = transaction_service::insert_buy(&mut tx, &new).await?;

    let executed = journal_queries::mark_executed(&mut *tx, id, lot.id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Journal entry {} not found", id)))?;
    tx.commit().await?;

    info!("🚀 Executed journal entry {} as lot {}", id, lot.id);
    Ok(ExecutedJournalEntry {
        entry: executed,
        transaction_id: lot.id,
    })
}

pub async fn cancel(pool: &PgPool, id: Uuid) -> Result<JournalEntry, AppError> {
    let mut tx = pool.begin().await?;
    let entry = lock_entry(&mut tx, id).await?;
    ensure_transition(&entry, JournalStatus::Cancelled)?;
    let cancelled = journal_queries::cancel(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Journal entry {} not found", id)))?;
    tx.commit().await?;
    Ok(cancelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn entry(status: JournalStatus) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            account_holder_id: Uuid::nil(),
            advice_source_id: None,
            entry_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ticker: "AAPL".to_string(),
            exchange: "NASDAQ".to_string(),
            direction: TradeDirection::Buy,
            quantity: 10.0,
            entry_price: 100.0,
            target_price: None,
            target_price_2: None,
            stop_loss_price: None,
            status,
            exit_date: None,
            exit_price: None,
            exit_reason: None,
            notes: None,
            linked_trade_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_entry_can_be_closed() {
        assert!(ensure_transition(&entry(JournalStatus::Open), JournalStatus::Closed).is_ok());
    }

    #[test]
    fn test_closed_entry_cannot_be_executed_or_cancelled() {
        let closed = entry(JournalStatus::Closed);
        for next in [JournalStatus::Executed, JournalStatus::Cancelled, JournalStatus::Closed] {
            let err = ensure_transition(&closed, next).unwrap_err();
            assert!(matches!(err, AppError::Validation(msg) if msg.contains("from CLOSED")));
        }
    }

    #[test]
    fn test_executed_and_cancelled_entries_are_final() {
        assert!(ensure_transition(&entry(JournalStatus::Executed), JournalStatus::Cancelled).is_err());
        assert!(ensure_transition(&entry(JournalStatus::Cancelled), JournalStatus::Executed).is_err());
    }
}
