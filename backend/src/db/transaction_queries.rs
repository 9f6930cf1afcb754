use chrono::NaiveDate;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{NewTransaction, SaleWithPl, Transaction, UpdateTransaction};

pub async fn fetch_all<'e, E: PgExecutor<'e>>(
    executor: E,
    holder: Option<Uuid>,
    ticker: Option<&str>,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE ($1::uuid IS NULL OR account_holder_id = $1)
          AND ($2::text IS NULL OR ticker = $2)
        ORDER BY transaction_date DESC, created_at DESC
        "#,
    )
    .bind(holder)
    .bind(ticker)
    .fetch_all(executor)
    .await
}

pub async fn fetch_one<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Loads a row and locks it until the surrounding transaction ends.
pub async fn fetch_one_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(executor)
        .await
}

pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, input: &NewTransaction) -> Result<Transaction, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (
            id, account_holder_id, ticker, exchange, transaction_type, quantity, price,
            transaction_date, original_quantity, quantity_remaining, parent_buy_id,
            limit_price_up, limit_price_down, limit_up_expiration, limit_down_expiration,
            advice_source_id, linked_journal_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(input.account_holder_id)
    .bind(&input.ticker)
    .bind(&input.exchange)
    .bind(input.transaction_type)
    .bind(input.quantity)
    .bind(input.price)
    .bind(input.transaction_date)
    .bind(input.original_quantity)
    .bind(input.quantity_remaining)
    .bind(input.parent_buy_id)
    .bind(input.limit_price_up)
    .bind(input.limit_price_down)
    .bind(input.limit_up_expiration)
    .bind(input.limit_down_expiration)
    .bind(input.advice_source_id)
    .bind(input.linked_journal_id)
    .fetch_one(executor)
    .await
}

/// Moves a lot's remaining quantity by `delta`, clamped to `[0, original_quantity]`.
pub async fn adjust_remaining<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, delta: f64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET quantity_remaining = GREATEST(0, LEAST(original_quantity, quantity_remaining + $2))
        WHERE id = $1 AND transaction_type = 'BUY'
        "#,
    )
    .bind(id)
    .bind(delta)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn update<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    input: &UpdateTransaction,
    original_quantity: Option<f64>,
    quantity_remaining: Option<f64>,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET exchange = $2,
            quantity = $3,
            price = $4,
            transaction_date = $5,
            original_quantity = $6,
            quantity_remaining = $7,
            limit_price_up = $8,
            limit_price_down = $9,
            limit_up_expiration = $10,
            limit_down_expiration = $11,
            advice_source_id = $12
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&input.exchange)
    .bind(input.quantity)
    .bind(input.price)
    .bind(input.transaction_date)
    .bind(original_quantity)
    .bind(quantity_remaining)
    .bind(input.limit_price_up)
    .bind(input.limit_price_down)
    .bind(input.limit_up_expiration)
    .bind(input.limit_down_expiration)
    .bind(input.advice_source_id)
    .fetch_optional(executor)
    .await
}

pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transactions WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

pub async fn count_sales<'e, E: PgExecutor<'e>>(executor: E, parent_buy_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE parent_buy_id = $1")
        .bind(parent_buy_id)
        .fetch_one(executor)
        .await
}

/// SELL rows that consumed `parent_buy_id`, with the P/L each realized.
/// Date of the first SELL drawn from a lot.
pub async fn earliest_sale_date<'e, E: PgExecutor<'e>>(
    executor: E,
    parent_buy_id: Uuid,
) -> Result<Option<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<NaiveDate>>(
        "SELECT MIN(transaction_date) FROM transactions WHERE parent_buy_id = $1 AND transaction_type = 'SELL'",
    )
    .bind(parent_buy_id)
    .fetch_one(executor)
    .await
}

pub async fn fetch_sales<'e, E: PgExecutor<'e>>(executor: E, parent_buy_id: Uuid) -> Result<Vec<SaleWithPl>, sqlx::Error> {
    sqlx::query_as::<_, SaleWithPl>(
        r#"
        SELECT s.id, s.quantity, s.price, s.transaction_date,
               p.price AS parent_buy_price,
               (s.price - p.price) * s.quantity AS realized_pl
        FROM transactions s
        JOIN transactions p ON p.id = s.parent_buy_id
        WHERE s.parent_buy_id = $1 AND s.transaction_type = 'SELL'
        ORDER BY s.transaction_date, s.created_at
        "#,
    )
    .bind(parent_buy_id)
    .fetch_all(executor)
    .await
}

/// Open BUY lots for one holder and ticker, oldest first, locked for update.
pub async fn fetch_open_lots_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    account_holder_id: Uuid,
    ticker: &str,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE account_holder_id = $1
          AND ticker = $2
          AND transaction_type = 'BUY'
          AND quantity_remaining > 0
        ORDER BY transaction_date, created_at
        FOR UPDATE
        "#,
    )
    .bind(account_holder_id)
    .bind(ticker)
    .fetch_all(executor)
    .await
}

/// Open lots as of today, optionally for one holder.
pub async fn fetch_open_lots<'e, E: PgExecutor<'e>>(
    executor: E,
    holder: Option<Uuid>,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE transaction_type = 'BUY'
          AND quantity_remaining > 0
          AND ($1::uuid IS NULL OR account_holder_id = $1)
        ORDER BY ticker, transaction_date, created_at
        "#,
    )
    .bind(holder)
    .fetch_all(executor)
    .await
}

/// Open lots carrying a take-profit or stop-loss.
pub async fn fetch_lots_with_limits<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE transaction_type = 'BUY'
          AND quantity_remaining > 0
          AND (limit_price_up IS NOT NULL OR limit_price_down IS NOT NULL)
        ORDER BY ticker
        "#,
    )
    .fetch_all(executor)
    .await
}

pub async fn clear_limits<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE transactions
        SET limit_price_up = NULL, limit_price_down = NULL,
            limit_up_expiration = NULL, limit_down_expiration = NULL
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn fetch_by_source<'e, E: PgExecutor<'e>>(executor: E, advice_source_id: Uuid) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE advice_source_id = $1 ORDER BY transaction_date DESC",
    )
    .bind(advice_source_id)
    .fetch_all(executor)
    .await
}

/// Candidates for import duplicate detection: a holder's rows in a date window.
pub async fn fetch_between<'e, E: PgExecutor<'e>>(
    executor: E,
    account_holder_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE account_holder_id = $1 AND transaction_date BETWEEN $2 AND $3
        ORDER BY transaction_date
        "#,
    )
    .bind(account_holder_id)
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}

/// Every ledger row in a stable order, for backups.
pub async fn fetch_ledger<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions ORDER BY transaction_date, created_at",
    )
    .fetch_all(executor)
    .await
}

pub async fn count_by_holder<'e, E: PgExecutor<'e>>(executor: E, account_holder_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE account_holder_id = $1")
        .bind(account_holder_id)
        .fetch_one(executor)
        .await
}

/// Case-insensitive, so rows written before names were upper-cased still count.
pub async fn count_by_exchange<'e, E: PgExecutor<'e>>(executor: E, exchange: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM transactions WHERE UPPER(TRIM(exchange)) = UPPER($1)")
        .bind(exchange)
        .fetch_one(executor)
        .await
}
