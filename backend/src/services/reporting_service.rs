use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{price_queries, reporting_queries, transaction_queries};
use crate::domain::{remaining_as_of, weighted_average_cost};
use crate::errors::AppError;
use crate::models::{
    DailyPerformance, LotAsOf, PortfolioOverviewRow, PositionsReport, PriceQuote, PriceValue,
    RealizedPlSummary, Transaction,
};
use crate::services::price_service::{priority, PriceService};
use crate::utils::QUANTITY_EPSILON;

/// Rebuilds each BUY lot as it stood at the end of `as_of` by adding back
/// the SELLs dated later. Lots that were already closed are dropped.
pub fn reconstruct_lots(buys: Vec<Transaction>, later_sells: &[(Uuid, NaiveDate, f64)], as_of: NaiveDate) -> Vec<LotAsOf> {
    let mut sells_by_lot: HashMap<Uuid, Vec<(NaiveDate, f64)>> = HashMap::new();
    for (parent, date, qty) in later_sells {
        sells_by_lot.entry(*parent).or_default().push((*date, *qty));
    }

    buys.into_iter()
        .filter(|lot| lot.transaction_date <= as_of)
        .filter_map(|lot| {
            let sells = sells_by_lot.get(&lot.id).map(Vec::as_slice).unwrap_or(&[]);
            let remaining = remaining_as_of(lot.remaining(), sells, as_of);
            (remaining > QUANTITY_EPSILON).then(|| LotAsOf {
                id: lot.id,
                account_holder_id: lot.account_holder_id,
                ticker: lot.ticker,
                exchange: lot.exchange,
                price: lot.price,
                transaction_date: lot.transaction_date,
                quantity_remaining: remaining,
                limit_price_up: lot.limit_price_up,
                limit_price_down: lot.limit_price_down,
            })
        })
        .collect()
}

/// Σ price × quantity, falling back to each lot's cost when no price is known.
pub fn valuation(lots: &[LotAsOf], prices: &HashMap<String, f64>) -> f64 {
    lots.iter()
        .map(|lot| {
            let price = prices.get(&lot.ticker).copied().unwrap_or(lot.price);
            price * lot.quantity_remaining
        })
        .sum()
}

pub fn performance(date: NaiveDate, previous_value: f64, current_value: f64) -> DailyPerformance {
    let daily_change = current_value - previous_value;
    let daily_change_percent = if previous_value.abs() > f64::EPSILON {
        daily_change / previous_value * 100.0
    } else {
        0.0
    };
    DailyPerformance {
        date,
        previous_value,
        current_value,
        daily_change,
        daily_change_percent,
    }
}

fn distinct_tickers(lots: &[LotAsOf]) -> Vec<String> {
    let mut tickers: Vec<String> = lots.iter().map(|l| l.ticker.clone()).collect();
    tickers.sort();
    tickers.dedup();
    tickers
}

fn live_numbers(quotes: HashMap<String, PriceQuote>) -> HashMap<String, f64> {
    quotes
        .into_iter()
        .filter_map(|(ticker, quote)| quote.price.as_f64().map(|p| (ticker, p)))
        .collect()
}

async fn lots_as_of(pool: &PgPool, date: NaiveDate, holder: Option<Uuid>) -> Result<Vec<LotAsOf>, AppError> {
    let buys = reporting_queries::fetch_buys_through(pool, date, holder).await?;
    let later_sells = reporting_queries::fetch_sells_after(pool, date, holder).await?;
    Ok(reconstruct_lots(buys, &later_sells, date))
}

pub async fn daily_performance(
    pool: &PgPool,
    prices: &Arc<PriceService>,
    date: NaiveDate,
    holder: Option<Uuid>,
) -> Result<DailyPerformance, AppError> {
    let previous_day = date
        .pred_opt()
        .ok_or_else(|| AppError::validation(format!("No day before {}", date)))?;

    let previous_lots = lots_as_of(pool, previous_day, holder).await?;
    let current_lots = lots_as_of(pool, date, holder).await?;

    // Yesterday: recorded closes first, live quotes for the gaps
    let previous_tickers = distinct_tickers(&previous_lots);
    let mut previous_prices = price_queries::fetch_closes_on(pool, &previous_tickers, previous_day).await?;
    let missing: Vec<String> = previous_tickers
        .iter()
        .filter(|t| !previous_prices.contains_key(*t))
        .cloned()
        .collect();

    let mut wanted = distinct_tickers(&current_lots);
    wanted.extend(missing.iter().cloned());
    let live = live_numbers(prices.get_prices(&wanted, priority::REPORTING).await);

    for ticker in missing {
        if let Some(price) = live.get(&ticker) {
            previous_prices.insert(ticker, *price);
        }
    }
    debug!(
        "Daily performance {}: {} lots yesterday, {} today, {} live quotes",
        date,
        previous_lots.len(),
        current_lots.len(),
        live.len()
    );

    Ok(performance(
        date,
        valuation(&previous_lots, &previous_prices),
        valuation(&current_lots, &live),
    ))
}

pub async fn positions(pool: &PgPool, date: NaiveDate, holder: Option<Uuid>) -> Result<PositionsReport, AppError> {
    let daily_transactions = reporting_queries::fetch_daily_transactions(pool, date, holder).await?;
    let end_of_day_positions = lots_as_of(pool, date, holder).await?;
    Ok(PositionsReport {
        date,
        daily_transactions,
        end_of_day_positions,
    })
}

/// Realized P/L by exchange; both bounds `None` means lifetime.
pub async fn realized_pl(
    pool: &PgPool,
    holder: Option<Uuid>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<RealizedPlSummary, AppError> {
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(AppError::validation("start_date is after end_date"));
        }
    }
    let by_exchange = reporting_queries::fetch_realized_by_exchange(pool, holder, start_date, end_date).await?;
    let total_realized_pl = by_exchange.iter().map(|e| e.realized_pl).sum();
    Ok(RealizedPlSummary {
        start_date,
        end_date,
        total_realized_pl,
        by_exchange,
    })
}

/// One row per ticker over the given open lots.
pub fn overview_rows(open_lots: &[Transaction], quotes: &HashMap<String, PriceQuote>) -> Vec<PortfolioOverviewRow> {
    let mut by_ticker: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for lot in open_lots.iter().filter(|l| l.remaining() > QUANTITY_EPSILON) {
        by_ticker.entry(lot.ticker.as_str()).or_default().push(lot);
    }

    by_ticker
        .into_iter()
        .filter_map(|(ticker, lots)| {
            let average = weighted_average_cost(lots.iter().map(|l| (l.price, l.remaining())))?;
            let total_quantity: f64 = lots.iter().map(|l| l.remaining()).sum();
            let total_cost = average * total_quantity;
            let current_price = quotes.get(ticker).map(|q| q.price).unwrap_or(PriceValue::Unavailable);
            let market_value = current_price.as_f64().map(|p| p * total_quantity);
            let unrealized_pl = market_value.map(|mv| mv - total_cost);
            let unrealized_pl_percent = unrealized_pl
                .filter(|_| total_cost > 0.0)
                .map(|pl| pl / total_cost * 100.0);

            Some(PortfolioOverviewRow {
                ticker: ticker.to_string(),
                exchange: lots[0].exchange.clone(),
                lot_count: lots.len(),
                total_quantity,
                weighted_average_cost: average,
                total_cost,
                current_price,
                market_value,
                unrealized_pl,
                unrealized_pl_percent,
            })
        })
        .collect()
}

pub async fn portfolio_overview(
    pool: &PgPool,
    prices: &Arc<PriceService>,
    holder: Option<Uuid>,
) -> Result<Vec<PortfolioOverviewRow>, AppError> {
    let open_lots = transaction_queries::fetch_open_lots(pool, holder).await?;
    let mut tickers: Vec<String> = open_lots.iter().map(|l| l.ticker.clone()).collect();
    tickers.sort();
    tickers.dedup();

    let quotes = prices.get_prices(&tickers, priority::REPORTING).await;
    let rows = overview_rows(&open_lots, &quotes);
    info!("📊 Portfolio overview: {} tickers across {} lots", rows.len(), open_lots.len());
    Ok(rows)
}
