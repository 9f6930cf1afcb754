use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{CreateJournalEntry, JournalEntry, JournalStatus, TradeDirection, UpdateJournalEntry};

pub async fn fetch_all<'e, E: PgExecutor<'e>>(
    executor: E,
    holder: Option<Uuid>,
    status: Option<JournalStatus>,
) -> Result<Vec<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        r#"
        SELECT * FROM journal_entries
        WHERE ($1::uuid IS NULL OR account_holder_id = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY entry_date DESC, created_at DESC
        "#,
    )
    .bind(holder)
    .bind(status)
    .fetch_all(executor)
    .await
}

pub async fn fetch_one<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>("SELECT * FROM journal_entries WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn fetch_one_for_update<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>("SELECT * FROM journal_entries WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn create<'e, E: PgExecutor<'e>>(executor: E, input: &CreateJournalEntry, ticker: &str) -> Result<JournalEntry, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        r#"
        INSERT INTO journal_entries (
            id, account_holder_id, advice_source_id, entry_date, ticker, exchange, direction,
            quantity, entry_price, target_price, target_price_2, stop_loss_price, status, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'OPEN', $13)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.account_holder_id)
    .bind(input.advice_source_id)
    .bind(input.entry_date)
    .bind(ticker)
    .bind(&input.exchange)
    .bind(input.direction.unwrap_or(TradeDirection::Buy))
    .bind(input.quantity)
    .bind(input.entry_price)
    .bind(input.target_price)
    .bind(input.target_price_2)
    .bind(input.stop_loss_price)
    .bind(&input.notes)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    input: &UpdateJournalEntry,
    ticker: &str,
) -> Result<Option<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        r#"
        UPDATE journal_entries
        SET advice_source_id = $2, entry_date = $3, ticker = $4, exchange = $5, direction = $6,
            quantity = $7, entry_price = $8, target_price = $9, target_price_2 = $10,
            stop_loss_price = $11, notes = $12
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(input.advice_source_id)
    .bind(input.entry_date)
    .bind(ticker)
    .bind(&input.exchange)
    .bind(input.direction)
    .bind(input.quantity)
    .bind(input.entry_price)
    .bind(input.target_price)
    .bind(input.target_price_2)
    .bind(input.stop_loss_price)
    .bind(&input.notes)
    .fetch_optional(executor)
    .await
}

pub async fn close<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    exit_price: f64,
    exit_date: chrono::NaiveDate,
    exit_reason: Option<&str>,
) -> Result<Option<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        r#"
        UPDATE journal_entries
        SET status = 'CLOSED', exit_price = $2, exit_date = $3, exit_reason = $4
        WHERE id = $1 AND status = 'OPEN'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(exit_price)
    .bind(exit_date)
    .bind(exit_reason)
    .fetch_optional(executor)
    .await
}

pub async fn mark_executed<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, linked_trade_id: Uuid) -> Result<Option<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        r#"
        UPDATE journal_entries
        SET status = 'EXECUTED', linked_trade_id = $2
        WHERE id = $1 AND status = 'OPEN'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(linked_trade_id)
    .fetch_optional(executor)
    .await
}

pub async fn cancel<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        "UPDATE journal_entries SET status = 'CANCELLED' WHERE id = $1 AND status = 'OPEN' RETURNING *",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM journal_entries WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_by_source<'e, E: PgExecutor<'e>>(executor: E, advice_source_id: Uuid) -> Result<Vec<JournalEntry>, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        "SELECT * FROM journal_entries WHERE advice_source_id = $1 ORDER BY entry_date DESC",
    )
    .bind(advice_source_id)
    .fetch_all(executor)
    .await
}
