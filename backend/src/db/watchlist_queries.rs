use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{SaveWatchlistItem, WatchlistItem, WatchlistStatus};

pub async fn fetch_all<'e, E: PgExecutor<'e>>(
    executor: E,
    holder: Option<Uuid>,
    status: Option<WatchlistStatus>,
) -> Result<Vec<WatchlistItem>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistItem>(
        r#"
        SELECT * FROM watchlist
        WHERE ($1::uuid IS NULL OR account_holder_id = $1)
          AND ($2::text IS NULL OR status = $2)
        ORDER BY ticker, created_at DESC
        "#,
    )
    .bind(holder)
    .bind(status)
    .fetch_all(executor)
    .await
}

pub async fn create<'e, E: PgExecutor<'e>>(executor: E, input: &SaveWatchlistItem, ticker: &str) -> Result<WatchlistItem, sqlx::Error> {
    sqlx::query_as::<_, WatchlistItem>(
        r#"
        INSERT INTO watchlist (
            id, account_holder_id, ticker, advice_source_id, rec_entry_low, rec_entry_high,
            rec_tp1, rec_tp2, rec_stop_loss, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.account_holder_id)
    .bind(ticker)
    .bind(input.advice_source_id)
    .bind(input.rec_entry_low)
    .bind(input.rec_entry_high)
    .bind(input.rec_tp1)
    .bind(input.rec_tp2)
    .bind(input.rec_stop_loss)
    .bind(&input.notes)
    .fetch_one(executor)
    .await
}

pub async fn update<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    input: &SaveWatchlistItem,
    ticker: &str,
) -> Result<Option<WatchlistItem>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistItem>(
        r#"
        UPDATE watchlist
        SET ticker = $2, advice_source_id = $3, rec_entry_low = $4, rec_entry_high = $5,
            rec_tp1 = $6, rec_tp2 = $7, rec_stop_loss = $8, notes = $9
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(ticker)
    .bind(input.advice_source_id)
    .bind(input.rec_entry_low)
    .bind(input.rec_entry_high)
    .bind(input.rec_tp1)
    .bind(input.rec_tp2)
    .bind(input.rec_stop_loss)
    .bind(&input.notes)
    .fetch_optional(executor)
    .await
}

pub async fn archive<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<WatchlistItem>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistItem>(
        "UPDATE watchlist SET status = 'ARCHIVED' WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Archives the ideas a new position was opened from.
pub async fn archive_matching<'e, E: PgExecutor<'e>>(
    executor: E,
    account_holder_id: Uuid,
    ticker: &str,
    advice_source_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE watchlist SET status = 'ARCHIVED'
        WHERE account_holder_id = $1 AND ticker = $2 AND advice_source_id = $3 AND status = 'ACTIVE'
        "#,
    )
    .bind(account_holder_id)
    .bind(ticker)
    .bind(advice_source_id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM watchlist WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_by_source<'e, E: PgExecutor<'e>>(executor: E, advice_source_id: Uuid) -> Result<Vec<WatchlistItem>, sqlx::Error> {
    sqlx::query_as::<_, WatchlistItem>(
        "SELECT * FROM watchlist WHERE advice_source_id = $1 ORDER BY created_at DESC",
    )
    .bind(advice_source_id)
    .fetch_all(executor)
    .await
}
