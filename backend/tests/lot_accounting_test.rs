/// Lot bookkeeping end to end without a database.
///
/// A FIFO sell is allocated across lots, applied to their remaining
/// quantities, priced for realized P/L and then unwound again by the
/// as-of reconstruction used in reporting.

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use portfolio_tracker::domain::{
    allocate_fifo, realized_pl, validate_allocation_total, validate_sell_against_parent, LotError, OpenLot,
    SellRequest,
};
use portfolio_tracker::models::{LotAllocation, Transaction, TransactionType};
use portfolio_tracker::services::reporting_service::reconstruct_lots;
use portfolio_tracker::utils::format_accounting;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn lot(quantity: f64, price: f64, on: NaiveDate, seq: i64) -> Transaction {
    Transaction {
        id: Uuid::new_v4(),
        account_holder_id: Uuid::nil(),
        ticker: "AAPL".to_string(),
        exchange: "NASDAQ".to_string(),
        transaction_type: TransactionType::Buy,
        quantity,
        price,
        transaction_date: on,
        original_quantity: Some(quantity),
        quantity_remaining: Some(quantity),
        parent_buy_id: None,
        limit_price_up: None,
        limit_price_down: None,
        limit_up_expiration: None,
        limit_down_expiration: None,
        advice_source_id: None,
        linked_journal_id: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(seq),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_sell_then_reconstruct_previous_day() {
        let mut lots = vec![
            lot(10.0, 100.0, date(2024, 1, 2), 0),
            lot(10.0, 120.0, date(2024, 1, 5), 1),
        ];
        let sell_date = date(2024, 2, 1);
        let sell_price = 130.0;

        let open: Vec<OpenLot> = lots.iter().map(OpenLot::from).collect();
        let allocations = allocate_fifo("AAPL", &open, 15.0).unwrap();
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].parent_buy_id, lots[0].id);
        assert!((allocations[1].quantity_to_sell - 5.0).abs() < 1e-9);

        let mut sells = Vec::new();
        let mut total_pl = 0.0;
        for allocation in &allocations {
            let parent = lots.iter_mut().find(|l| l.id == allocation.parent_buy_id).unwrap();
            let request = SellRequest {
                account_holder_id: parent.account_holder_id,
                ticker: "AAPL",
                quantity: allocation.quantity_to_sell,
                sell_date,
            };
            validate_sell_against_parent(parent, &request).unwrap();

            total_pl += realized_pl(sell_price, parent.price, allocation.quantity_to_sell);
            parent.quantity_remaining = Some(parent.remaining() - allocation.quantity_to_sell);
            sells.push((parent.id, sell_date, allocation.quantity_to_sell));
        }

        // 10 × 30 + 5 × 10
        assert!((total_pl - 350.0).abs() < 1e-9);
        assert_eq!(format_accounting(total_pl), "$350.00");

        let today = reconstruct_lots(lots.clone(), &sells, sell_date);
        assert_eq!(today.len(), 1);
        assert!((today[0].quantity_remaining - 5.0).abs() < 1e-9);

        let day_before = reconstruct_lots(lots, &sells, date(2024, 1, 31));
        let held: f64 = day_before.iter().map(|l| l.quantity_remaining).sum();
        assert!((held - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_selective_sell_must_match_declared_quantity() {
        let first = lot(10.0, 100.0, date(2024, 1, 2), 0);
        let second = lot(10.0, 120.0, date(2024, 1, 5), 1);
        let allocations = vec![
            LotAllocation { parent_buy_id: first.id, quantity_to_sell: 3.0 },
            LotAllocation { parent_buy_id: second.id, quantity_to_sell: 4.000001 },
        ];

        assert!(validate_allocation_total(7.0, &allocations).is_ok());
        assert!(matches!(
            validate_allocation_total(8.0, &allocations),
            Err(LotError::AllocationMismatch { .. })
        ));
    }

    #[test]
    fn test_losses_render_in_parentheses() {
        let pl = realized_pl(95.0, 100.0, 3.0);
        assert_eq!(format_accounting(pl), "($15.00)");
        assert_eq!(format_accounting(-1234.567), "($1,234.57)");
        assert_eq!(format_accounting(0.0), "$0.00");
    }
}
