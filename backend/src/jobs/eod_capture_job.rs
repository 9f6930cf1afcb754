use std::collections::HashSet;

use chrono::Utc;
use tracing::{info, warn};

use crate::db::{price_queries, reporting_queries};
use crate::errors::AppError;
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::price_service::priority;
use crate::utils::QUANTITY_EPSILON;

/// Tickers whose close must not be refetched: fully sold and already recorded today.
pub fn frozen_tickers(holdings: &[(String, f64)], recorded_today: &HashSet<String>) -> HashSet<String> {
    holdings
        .iter()
        .filter(|(ticker, remaining)| *remaining <= QUANTITY_EPSILON && recorded_today.contains(ticker))
        .map(|(ticker, _)| ticker.clone())
        .collect()
}

/// Records today's close for every ticker still held or traded today.
pub async fn capture_closing_prices(ctx: JobContext) -> Result<JobResult, AppError> {
    let today = Utc::now().date_naive();
    let holdings = reporting_queries::fetch_tickers_active_on(&ctx.pool, today).await?;

    if holdings.is_empty() {
        info!("No tickers to capture for {}", today);
        return Ok(JobResult::default());
    }

    let sold_out: Vec<String> = holdings
        .iter()
        .filter(|(_, remaining)| *remaining <= QUANTITY_EPSILON)
        .map(|(ticker, _)| ticker.clone())
        .collect();
    let recorded: HashSet<String> = price_queries::fetch_closes_on(&ctx.pool, &sold_out, today)
        .await?
        .into_keys()
        .collect();
    let frozen = frozen_tickers(&holdings, &recorded);

    let tickers: Vec<String> = holdings
        .into_iter()
        .map(|(ticker, _)| ticker)
        .filter(|ticker| !frozen.contains(ticker))
        .collect();
    info!("📈 Capturing closes for {} tickers ({} frozen)", tickers.len(), frozen.len());

    let quotes = ctx.prices.get_prices(&tickers, priority::EOD_CAPTURE).await;

    let mut processed = 0;
    let mut failed = 0;
    for ticker in &tickers {
        let Some(close) = quotes.get(ticker).and_then(|q| q.price.as_f64()) else {
            warn!("⚠️ No usable close for {} on {}", ticker, today);
            failed += 1;
            continue;
        };
        match price_queries::upsert_close(&ctx.pool, ticker, today, close).await {
            Ok(()) => processed += 1,
            Err(e) => {
                warn!("❌ Failed to store close for {}: {}", ticker, e);
                failed += 1;
            }
        }
    }

    Ok(JobResult {
        items_processed: processed,
        items_failed: failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_sold_out_and_recorded_tickers_freeze() {
        let holdings = vec![
            ("AAPL".to_string(), 10.0),
            ("MSFT".to_string(), 0.0),
            ("SHOP".to_string(), 0.0),
        ];
        let recorded: HashSet<String> = ["MSFT".to_string(), "AAPL".to_string()].into_iter().collect();

        let frozen = frozen_tickers(&holdings, &recorded);
        assert!(frozen.contains("MSFT"));
        assert!(!frozen.contains("AAPL"));
        assert!(!frozen.contains("SHOP"));
    }
}
