use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::PgExecutor;

use crate::models::HistoricalPrice;

pub async fn upsert_close<'e, E: PgExecutor<'e>>(
    executor: E,
    ticker: &str,
    date: NaiveDate,
    close_price: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO historical_prices (ticker, date, close_price)
        VALUES ($1, $2, $3)
        ON CONFLICT (ticker, date)
        DO UPDATE SET close_price = EXCLUDED.close_price
        "#,
    )
    .bind(ticker)
    .bind(date)
    .bind(close_price)
    .execute(executor)
    .await?;
    Ok(())
}

/// Closing prices recorded for `date`, keyed by ticker.
pub async fn fetch_closes_on<'e, E: PgExecutor<'e>>(
    executor: E,
    tickers: &[String],
    date: NaiveDate,
) -> Result<HashMap<String, f64>, sqlx::Error> {
    if tickers.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, HistoricalPrice>(
        r#"
        SELECT ticker, date, close_price
        FROM historical_prices
        WHERE ticker = ANY($1) AND date = $2
        "#,
    )
    .bind(tickers)
    .bind(date)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|p| (p.ticker, p.close_price)).collect())
}
