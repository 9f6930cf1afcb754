/// Reporting calculations over reconstructed lots.
///
/// Covers:
/// - End-of-day lot reconstruction (adding back later SELLs)
/// - Valuation with price fallback to cost basis
/// - Daily performance arithmetic
/// - Portfolio overview rows with sentinel prices
///
/// These run against the pure functions; the SQL that feeds them is
/// exercised by the API against a live database.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use portfolio_tracker::models::{PriceQuote, PriceValue, Transaction, TransactionType};
use portfolio_tracker::services::reporting_service::{overview_rows, performance, reconstruct_lots, valuation};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn buy(ticker: &str, quantity: f64, remaining: f64, price: f64, on: NaiveDate) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        account_holder_id: Uuid::nil(),
        ticker: ticker.to_string(),
        exchange: "NASDAQ".to_string(),
        transaction_type: TransactionType::Buy,
        quantity,
        price,
        transaction_date: on,
        original_quantity: Some(quantity),
        quantity_remaining: Some(remaining),
        parent_buy_id: None,
        limit_price_up: None,
        limit_price_down: None,
        limit_up_expiration: None,
        limit_down_expiration: None,
        advice_source_id: None,
        linked_journal_id: None,
        created_at: Utc::now(),
    }
}

fn quote(price: PriceValue) -> PriceQuote {
    PriceQuote {
        price,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Lot reconstruction
    // -----------------------------------------------------------------------

    #[test]
    fn test_reconstruct_adds_back_later_sells() {
        // Bought 10, sold 4 on the 5th and 6 on the 9th: closed today
        let lot = buy("AAPL", 10.0, 0.0, 100.0, date(2024, 1, 2));
        let sells = vec![(lot.id, date(2024, 1, 5), 4.0), (lot.id, date(2024, 1, 9), 6.0)];

        let as_of_4th = reconstruct_lots(vec![lot.clone()], &sells, date(2024, 1, 4));
        assert_eq!(as_of_4th.len(), 1);
        assert!((as_of_4th[0].quantity_remaining - 10.0).abs() < 1e-9);

        // Only the sell after the 6th is added back
        let as_of_6th = reconstruct_lots(vec![lot.clone()], &sells, date(2024, 1, 6));
        assert!((as_of_6th[0].quantity_remaining - 6.0).abs() < 1e-9);

        let as_of_10th = reconstruct_lots(vec![lot], &[], date(2024, 1, 10));
        assert!(as_of_10th.is_empty(), "closed lot should not appear");
    }

    #[test]
    fn test_reconstruct_ignores_lots_bought_later() {
        let early = buy("MSFT", 5.0, 5.0, 300.0, date(2024, 3, 1));
        let late = buy("MSFT", 5.0, 5.0, 310.0, date(2024, 3, 8));

        let lots = reconstruct_lots(vec![early.clone(), late], &[], date(2024, 3, 4));
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].id, early.id);
    }

    // -----------------------------------------------------------------------
    // Valuation and performance
    // -----------------------------------------------------------------------

    #[test]
    fn test_valuation_falls_back_to_cost() {
        let lots = reconstruct_lots(
            vec![
                buy("AAPL", 10.0, 10.0, 100.0, date(2024, 1, 2)),
                buy("SHOP", 4.0, 4.0, 50.0, date(2024, 1, 2)),
            ],
            &[],
            date(2024, 1, 3),
        );
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), 110.0);

        // AAPL at market, SHOP at cost
        assert!((valuation(&lots, &prices) - (1100.0 + 200.0)).abs() < 1e-9);
    }

    #[test]
    fn test_daily_performance_percent() {
        let perf = performance(date(2024, 1, 3), 1000.0, 1050.0);
        assert!((perf.daily_change - 50.0).abs() < 1e-9);
        assert!((perf.daily_change_percent - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_daily_performance_zero_previous_value() {
        let perf = performance(date(2024, 1, 3), 0.0, 500.0);
        assert!((perf.daily_change - 500.0).abs() < 1e-9);
        assert_eq!(perf.daily_change_percent, 0.0);
    }

    // -----------------------------------------------------------------------
    // Portfolio overview
    // -----------------------------------------------------------------------

    #[test]
    fn test_overview_weighted_average_and_unrealized() {
        let lots = vec![
            buy("AAPL", 10.0, 10.0, 100.0, date(2024, 1, 2)),
            buy("AAPL", 10.0, 5.0, 130.0, date(2024, 2, 2)),
        ];
        let mut quotes = HashMap::new();
        quotes.insert("AAPL".to_string(), quote(PriceValue::Price(120.0)));

        let rows = overview_rows(&lots, &quotes);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];

        // (100*10 + 130*5) / 15 = 110
        assert!((row.total_quantity - 15.0).abs() < 1e-9);
        assert!((row.weighted_average_cost - 110.0).abs() < 1e-9);
        assert!((row.total_cost - 1650.0).abs() < 1e-9);
        assert_eq!(row.market_value, Some(1800.0));
        assert!((row.unrealized_pl.unwrap() - 150.0).abs() < 1e-9);
        assert_eq!(row.lot_count, 2);
    }

    #[test]
    fn test_overview_sentinel_price_leaves_market_value_empty() {
        let lots = vec![buy("ZZZZ", 3.0, 3.0, 10.0, date(2024, 1, 2))];
        let mut quotes = HashMap::new();
        quotes.insert("ZZZZ".to_string(), quote(PriceValue::Invalid));

        let rows = overview_rows(&lots, &quotes);
        assert_eq!(rows[0].current_price, PriceValue::Invalid);
        assert!(rows[0].market_value.is_none());
        assert!(rows[0].unrealized_pl.is_none());
    }

    #[test]
    fn test_overview_skips_closed_lots_and_sorts_by_ticker() {
        let lots = vec![
            buy("TSLA", 2.0, 2.0, 200.0, date(2024, 1, 2)),
            buy("AAPL", 5.0, 0.0, 100.0, date(2024, 1, 2)),
            buy("AMD", 1.0, 1.0, 90.0, date(2024, 1, 2)),
        ];
        let rows = overview_rows(&lots, &HashMap::new());
        let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AMD", "TSLA"]);
        assert_eq!(rows[0].current_price, PriceValue::Unavailable);
    }
}
