/// Brokerage CSV import: parsing, duplicate detection and row selection.
///
/// Templates are the built-in ones; the DB commit path is not covered here.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use portfolio_tracker::models::{
    ImportAction, ImportRequest, ImportRowStatus, ImportSession, RowResolution, Transaction, TransactionType,
};
use portfolio_tracker::services::csv_import_service::{parse_csv, parse_number, reconcile, rows_to_import};
use portfolio_tracker::services::import_templates::find_template;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn existing(ticker: &str, kind: TransactionType, quantity: f64, price: f64, on: NaiveDate) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        account_holder_id: Uuid::nil(),
        ticker: ticker.to_string(),
        exchange: "NASDAQ".to_string(),
        transaction_type: kind,
        quantity,
        price,
        transaction_date: on,
        original_quantity: None,
        quantity_remaining: None,
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

fn session_from(csv: &str, template: &str) -> ImportSession {
    let template = find_template(template).unwrap();
    let parsed = parse_csv(csv.as_bytes(), &template, None).unwrap();
    ImportSession {
        id: Uuid::new_v4(),
        account_holder_id: Uuid::nil(),
        template: template.name,
        rows: parsed.rows,
        errors: parsed.errors,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Number cells
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number("$1,234.50"), Some(1234.5));
        assert_eq!(parse_number("(12.00)"), Some(-12.0));
        assert_eq!(parse_number(" -3 "), Some(-3.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
    }

    // -----------------------------------------------------------------------
    // Parsing
    // -----------------------------------------------------------------------

    #[test]
    fn test_generic_template_parses_rows_and_reports_errors() {
        let csv = "Date,Ticker,Type,Quantity,Price,Exchange\n\
                   2024-01-02, aapl ,BUY,10,185.50,nasdaq\n\
                   2024-01-03,MSFT,SELL,5,$370.00,\n\
                   not-a-date,TSLA,BUY,1,200,NASDAQ\n\
                   2024-01-04,AMD,TRANSFER,1,100,NASDAQ\n";
        let template = find_template("generic").unwrap();
        let parsed = parse_csv(csv.as_bytes(), &template, Some("tsx")).unwrap();

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].ticker, "AAPL");
        assert_eq!(parsed.rows[0].exchange, "NASDAQ");
        assert_eq!(parsed.rows[0].transaction_type, TransactionType::Buy);
        assert_eq!(parsed.rows[1].exchange, "TSX", "blank exchange falls back to the form default");
        assert_eq!(parsed.rows[1].price, 370.0);
        assert_eq!(parsed.rows[1].row_index, 1);

        assert_eq!(parsed.errors.len(), 2);
        assert!(parsed.errors[0].starts_with("Line 4:"));
        assert!(parsed.errors[1].contains("TRANSFER"));
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let csv = "Date,Symbol,Type,Quantity,Price\n2024-01-02,AAPL,BUY,1,1\n";
        let template = find_template("generic").unwrap();
        assert!(parse_csv(csv.as_bytes(), &template, None).is_err());
    }

    #[test]
    fn test_robinhood_skips_cash_rows_and_strips_suffix() {
        let csv = "Activity Date,Instrument,Trans Code,Quantity,Price,Amount\n\
                   01/05/2024,SHOP.TO,Buy,3,$75.10,($225.30)\n\
                   01/06/2024,,ACH,,,$500.00\n\
                   01/07/2024,KO,CDIV,,,$4.60\n";
        let session = session_from(csv, "robinhood");

        assert!(session.errors.is_empty(), "unexpected errors: {:?}", session.errors);
        assert_eq!(session.rows.len(), 2);
        assert_eq!(session.rows[0].ticker, "SHOP");
        assert_eq!(session.rows[0].exchange, "UNKNOWN");
        assert_eq!(session.rows[1].transaction_type, TransactionType::Dividend);
        assert_eq!(session.rows[1].quantity, 1.0);
        assert_eq!(session.rows[1].price, 4.6);
    }

    #[test]
    fn test_fidelity_actions_map_by_prefix() {
        let csv = "Run Date,Action,Symbol,Quantity,Price ($),Amount ($)\n\
                   03/01/2024,YOU BOUGHT APPLE INC (AAPL) (Cash),AAPL,2,180.25,-360.50\n\
                   03/04/2024,YOU SOLD APPLE INC (AAPL) (Cash),AAPL,-1,182.00,182.00\n";
        let session = session_from(csv, "fidelity");

        assert_eq!(session.rows.len(), 2);
        assert_eq!(session.rows[0].transaction_date, date(2024, 3, 1));
        assert_eq!(session.rows[1].transaction_type, TransactionType::Sell);
        assert_eq!(session.rows[1].quantity, 1.0, "sold quantities are stored unsigned");
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    #[test]
    fn test_reconcile_flags_near_price_matches() {
        let csv = "Date,Ticker,Type,Quantity,Price\n\
                   2024-01-02,AAPL,BUY,10,185.51\n\
                   2024-01-02,AAPL,BUY,10,185.60\n\
                   2024-01-02,AAPL,SELL,10,185.50\n";
        let mut session = session_from(csv, "generic");
        let ledger = vec![existing("AAPL", TransactionType::Buy, 10.0, 185.50, date(2024, 1, 2))];

        reconcile(&mut session.rows, &ledger);

        assert_eq!(session.rows[0].status, ImportRowStatus::PotentialDuplicate);
        assert_eq!(session.rows[0].conflict_transaction_id, Some(ledger[0].id));
        assert_eq!(session.rows[1].status, ImportRowStatus::New, "0.10 apart is a different fill");
        assert_eq!(session.rows[2].status, ImportRowStatus::New, "type must match");
    }

    #[test]
    fn test_reupload_matches_sell_split_across_lots() {
        let csv = "Date,Ticker,Type,Quantity,Price\n\
                   2024-02-01,AAPL,SELL,15,130\n\
                   2024-02-01,AAPL,SELL,12,130\n";
        let mut session = session_from(csv, "generic");
        // A FIFO sell of 15 written as slices of 10 and 5
        let ledger = vec![
            existing("AAPL", TransactionType::Sell, 10.0, 130.0, date(2024, 2, 1)),
            existing("AAPL", TransactionType::Sell, 5.0, 130.0, date(2024, 2, 1)),
        ];

        reconcile(&mut session.rows, &ledger);

        assert_eq!(session.rows[0].status, ImportRowStatus::PotentialDuplicate);
        assert_eq!(session.rows[0].conflict_transaction_id, Some(ledger[0].id));
        assert_eq!(session.rows[1].status, ImportRowStatus::New, "slices sum to 15, not 12");
    }

    #[test]
    fn test_split_buys_are_not_summed() {
        let csv = "Date,Ticker,Type,Quantity,Price\n\
                   2024-02-01,AAPL,BUY,15,130\n";
        let mut session = session_from(csv, "generic");
        let ledger = vec![
            existing("AAPL", TransactionType::Buy, 10.0, 130.0, date(2024, 2, 1)),
            existing("AAPL", TransactionType::Buy, 5.0, 130.0, date(2024, 2, 1)),
        ];

        reconcile(&mut session.rows, &ledger);
        assert_eq!(session.rows[0].status, ImportRowStatus::New);
    }

    // -----------------------------------------------------------------------
    // Row selection
    // -----------------------------------------------------------------------

    #[test]
    fn test_default_resolutions_and_ordering() {
        let csv = "Date,Ticker,Type,Quantity,Price\n\
                   2024-01-03,AAPL,SELL,5,190\n\
                   2024-01-03,AAPL,BUY,5,189\n\
                   2024-01-02,AAPL,BUY,10,185.50\n";
        let mut session = session_from(csv, "generic");
        let ledger = vec![existing("AAPL", TransactionType::Buy, 10.0, 185.50, date(2024, 1, 2))];
        reconcile(&mut session.rows, &ledger);

        let request = ImportRequest {
            session_id: session.id,
            resolutions: Vec::new(),
        };
        let rows = rows_to_import(&session, &request).unwrap();

        // The duplicate is skipped; the BUY on the 3rd precedes the SELL
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].transaction_type, TransactionType::Buy);
        assert_eq!(rows[1].transaction_type, TransactionType::Sell);
    }

    #[test]
    fn test_explicit_resolutions_override_defaults() {
        let csv = "Date,Ticker,Type,Quantity,Price\n\
                   2024-01-02,AAPL,BUY,10,185.50\n\
                   2024-01-05,MSFT,BUY,1,400\n";
        let mut session = session_from(csv, "generic");
        let ledger = vec![existing("AAPL", TransactionType::Buy, 10.0, 185.50, date(2024, 1, 2))];
        reconcile(&mut session.rows, &ledger);

        let request = ImportRequest {
            session_id: session.id,
            resolutions: vec![
                RowResolution { row_index: 0, action: ImportAction::Import },
                RowResolution { row_index: 1, action: ImportAction::Skip },
            ],
        };
        let rows = rows_to_import(&session, &request).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticker, "AAPL");

        let bad = ImportRequest {
            session_id: session.id,
            resolutions: vec![RowResolution { row_index: 7, action: ImportAction::Import }],
        };
        assert!(rows_to_import(&session, &bad).is_err());
    }
}
