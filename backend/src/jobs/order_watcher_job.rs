use std::collections::HashMap;

use chrono::Utc;
use tracing::{error, info};

use crate::db::{order_queries, transaction_queries};
use crate::domain;
use crate::errors::AppError;
use crate::models::{PendingOrder, PriceQuote};
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::price_service::priority;
use crate::services::transaction_service;
use crate::utils::format_accounting;

pub fn order_message(order: &PendingOrder, price: f64) -> String {
    format!(
        "BUY LIMIT for {} {} at {} reached: trading at {}",
        order.quantity,
        order.ticker,
        format_accounting(order.limit_price),
        format_accounting(price)
    )
}

fn usable_price(quotes: &HashMap<String, PriceQuote>, ticker: &str) -> Option<f64> {
    quotes.get(ticker).and_then(|q| q.price.as_f64())
}

/// Scans active buy limits and lots with take-profit/stop-loss against one
/// batch of quotes. Tickers without a usable quote are left for the next run.
pub async fn run_order_watcher(ctx: JobContext) -> Result<JobResult, AppError> {
    let today = Utc::now().date_naive();
    let orders = order_queries::fetch_active(&ctx.pool, None).await?;
    let lots = transaction_queries::fetch_lots_with_limits(&ctx.pool).await?;

    if orders.is_empty() && lots.is_empty() {
        return Ok(JobResult::default());
    }

    let mut tickers: Vec<String> = orders
        .iter()
        .map(|o| o.ticker.clone())
        .chain(lots.iter().map(|l| l.ticker.clone()))
        .collect();
    tickers.sort();
    tickers.dedup();
    let quotes = ctx.prices.get_prices(&tickers, priority::ORDER_WATCHER).await;

    let mut processed = 0;
    let mut failed = 0;

    for order in orders.iter().filter(|o| !o.is_expired(today)) {
        let Some(price) = usable_price(&quotes, &order.ticker) else {
            continue;
        };
        if !order.is_triggered_by(price) {
            continue;
        }

        let outcome = order_queries::notify_order_once(
            &ctx.pool,
            order.account_holder_id,
            order.id,
            &order_message(order, price),
        )
        .await
        .map(|created| created.is_some());

        match outcome {
            Ok(true) => {
                info!("🔔 Buy limit reached for {} at {}", order.ticker, price);
                processed += 1;
            }
            Ok(false) => {}
            Err(e) => {
                error!("Failed to notify order {}: {}", order.id, e);
                failed += 1;
            }
        }
    }

    for lot in &lots {
        let Some(price) = usable_price(&quotes, &lot.ticker) else {
            continue;
        };
        let Some(trigger) = domain::limit_trigger(lot, price, today) else {
            continue;
        };

        match transaction_service::execute_limit_sell(&ctx.pool, lot.id, trigger, today).await {
            Ok(Some(_)) => processed += 1,
            Ok(None) => {}
            Err(e) => {
                error!("Failed to execute {} on lot {}: {}", trigger.kind, lot.id, e);
                failed += 1;
            }
        }
    }

    Ok(JobResult {
        items_processed: processed,
        items_failed: failed,
    })
}
