use chrono::NaiveDate;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{DailyTransaction, ExchangeRealizedPl, Transaction};

/// Every transaction dated `date`, SELLs joined to their lot's buy price.
pub async fn fetch_daily_transactions<'e, E: PgExecutor<'e>>(
    executor: E,
    date: NaiveDate,
    holder: Option<Uuid>,
) -> Result<Vec<DailyTransaction>, sqlx::Error> {
    sqlx::query_as::<_, DailyTransaction>(
        r#"
        SELECT t.id, t.account_holder_id, t.ticker, t.exchange, t.transaction_type,
               t.quantity, t.price, t.transaction_date, t.parent_buy_id,
               p.price AS parent_buy_price,
               CASE WHEN t.transaction_type = 'SELL' THEN (t.price - p.price) * t.quantity END AS realized_pl
        FROM transactions t
        LEFT JOIN transactions p ON p.id = t.parent_buy_id
        WHERE t.transaction_date = $1
          AND ($2::uuid IS NULL OR t.account_holder_id = $2)
        ORDER BY t.ticker, t.created_at
        "#,
    )
    .bind(date)
    .bind(holder)
    .fetch_all(executor)
    .await
}

/// BUY lots bought on or before `date`.
pub async fn fetch_buys_through<'e, E: PgExecutor<'e>>(
    executor: E,
    date: NaiveDate,
    holder: Option<Uuid>,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE transaction_type = 'BUY'
          AND transaction_date <= $1
          AND ($2::uuid IS NULL OR account_holder_id = $2)
        ORDER BY ticker, transaction_date, created_at
        "#,
    )
    .bind(date)
    .bind(holder)
    .fetch_all(executor)
    .await
}

/// `(parent_buy_id, sell_date, quantity)` for SELLs dated after `date`.
pub async fn fetch_sells_after<'e, E: PgExecutor<'e>>(
    executor: E,
    date: NaiveDate,
    holder: Option<Uuid>,
) -> Result<Vec<(Uuid, NaiveDate, f64)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, NaiveDate, f64)>(
        r#"
        SELECT parent_buy_id, transaction_date, quantity
        FROM transactions
        WHERE transaction_type = 'SELL'
          AND parent_buy_id IS NOT NULL
          AND transaction_date > $1
          AND ($2::uuid IS NULL OR account_holder_id = $2)
        "#,
    )
    .bind(date)
    .bind(holder)
    .fetch_all(executor)
    .await
}

/// Realized P/L grouped by exchange, optionally bounded by sell date.
pub async fn fetch_realized_by_exchange<'e, E: PgExecutor<'e>>(
    executor: E,
    holder: Option<Uuid>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<ExchangeRealizedPl>, sqlx::Error> {
    sqlx::query_as::<_, ExchangeRealizedPl>(
        r#"
        SELECT s.exchange, SUM((s.price - p.price) * s.quantity) AS realized_pl
        FROM transactions s
        JOIN transactions p ON p.id = s.parent_buy_id
        WHERE s.transaction_type = 'SELL'
          AND ($1::uuid IS NULL OR s.account_holder_id = $1)
          AND ($2::date IS NULL OR s.transaction_date >= $2)
          AND ($3::date IS NULL OR s.transaction_date <= $3)
        GROUP BY s.exchange
        ORDER BY s.exchange
        "#,
    )
    .bind(holder)
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await
}

/// Tickers held at any point today: open lots plus anything sold today.
pub async fn fetch_tickers_active_on<'e, E: PgExecutor<'e>>(
    executor: E,
    date: NaiveDate,
) -> Result<Vec<(String, f64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, f64)>(
        r#"
        SELECT ticker, COALESCE(SUM(quantity_remaining) FILTER (WHERE transaction_type = 'BUY'), 0) AS remaining
        FROM transactions
        WHERE ticker IN (
            SELECT ticker FROM transactions WHERE transaction_type = 'BUY' AND quantity_remaining > 0
            UNION
            SELECT ticker FROM transactions WHERE transaction_type = 'SELL' AND transaction_date = $1
        )
        GROUP BY ticker
        ORDER BY ticker
        "#,
    )
    .bind(date)
    .fetch_all(executor)
    .await
}
