//! Lot arithmetic shared by the transaction, import and order-watcher paths.
//!
//! Nothing in here touches the database: callers load the rows, these
//! functions decide whether a mutation is legal and what it changes.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{LotAllocation, Transaction, TransactionType};
use crate::utils::QUANTITY_EPSILON;

#[derive(Debug, Error, PartialEq)]
pub enum LotError {
    #[error("Quantity must be greater than 0")]
    NonPositiveQuantity,
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Lot {0} is not a BUY transaction")]
    ParentNotBuy(Uuid),
    #[error("Lot {lot_id} is for {lot_ticker}, not {ticker}")]
    TickerMismatch { lot_id: Uuid, lot_ticker: String, ticker: String },
    #[error("Lot {0} belongs to a different account holder")]
    HolderMismatch(Uuid),
    #[error("Sell quantity {requested} exceeds remaining quantity {available} of lot {lot_id}")]
    InsufficientQuantity { lot_id: Uuid, requested: f64, available: f64 },
    #[error("Sell date {sell_date} is before the buy date {buy_date} of lot {lot_id}")]
    SellBeforeBuy { lot_id: Uuid, sell_date: NaiveDate, buy_date: NaiveDate },
    #[error("Lot allocations sum to {allocated} but the sell quantity is {declared}")]
    AllocationMismatch { declared: f64, allocated: f64 },
    #[error("A selective sell needs at least one lot")]
    EmptyAllocation,
    #[error("Lot {0} appears more than once in the allocation")]
    DuplicateAllocation(Uuid),
    #[error("Not enough open {ticker} shares: requested {requested}, available {available}")]
    InsufficientOpenQuantity { ticker: String, requested: f64, available: f64 },
    #[error("New quantity {new_quantity} is below the {sold} shares already sold from this lot")]
    QuantityBelowSold { new_quantity: f64, sold: f64 },
}

impl From<LotError> for AppError {
    fn from(value: LotError) -> Self {
        AppError::Validation(value.to_string())
    }
}

/// The parts of a SELL request that get checked against its parent lot.
#[derive(Debug, Clone)]
pub struct SellRequest<'a> {
    pub account_holder_id: Uuid,
    pub ticker: &'a str,
    pub quantity: f64,
    pub sell_date: NaiveDate,
}

/// An open lot as seen by FIFO allocation.
#[derive(Debug, Clone)]
pub struct OpenLot {
    pub id: Uuid,
    pub transaction_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub price: f64,
    pub quantity_remaining: f64,
}

impl From<&Transaction> for OpenLot {
    fn from(t: &Transaction) -> Self {
        Self {
            id: t.id,
            transaction_date: t.transaction_date,
            created_at: t.created_at,
            price: t.price,
            quantity_remaining: t.remaining(),
        }
    }
}

pub fn realized_pl(sell_price: f64, buy_price: f64, quantity: f64) -> f64 {
    (sell_price - buy_price) * quantity
}

pub fn validate_trade_amounts(quantity: f64, price: f64) -> Result<(), LotError> {
    if !(quantity > 0.0) {
        return Err(LotError::NonPositiveQuantity);
    }
    if !(price >= 0.0) {
        return Err(LotError::NegativePrice);
    }
    Ok(())
}

/// Checks a single-lot sell against the lot it would consume.
pub fn validate_sell_against_parent(parent: &Transaction, sell: &SellRequest<'_>) -> Result<(), LotError> {
    if !(sell.quantity > 0.0) {
        return Err(LotError::NonPositiveQuantity);
    }
    if parent.transaction_type != TransactionType::Buy {
        return Err(LotError::ParentNotBuy(parent.id));
    }
    if !parent.ticker.eq_ignore_ascii_case(sell.ticker) {
        return Err(LotError::TickerMismatch {
            lot_id: parent.id,
            lot_ticker: parent.ticker.clone(),
            ticker: sell.ticker.to_string(),
        });
    }
    if parent.account_holder_id != sell.account_holder_id {
        return Err(LotError::HolderMismatch(parent.id));
    }
    let available = parent.remaining();
    if sell.quantity > available + QUANTITY_EPSILON {
        return Err(LotError::InsufficientQuantity {
            lot_id: parent.id,
            requested: sell.quantity,
            available,
        });
    }
    if sell.sell_date < parent.transaction_date {
        return Err(LotError::SellBeforeBuy {
            lot_id: parent.id,
            sell_date: sell.sell_date,
            buy_date: parent.transaction_date,
        });
    }
    Ok(())
}

/// Checks the shape of a selective sell before any lot is loaded.
pub fn validate_allocation_total(declared: f64, lots: &[LotAllocation]) -> Result<(), LotError> {
    if lots.is_empty() {
        return Err(LotError::EmptyAllocation);
    }
    let mut seen = std::collections::HashSet::new();
    for lot in lots {
        if !(lot.quantity_to_sell > 0.0) {
            return Err(LotError::NonPositiveQuantity);
        }
        if !seen.insert(lot.parent_buy_id) {
            return Err(LotError::DuplicateAllocation(lot.parent_buy_id));
        }
    }
    let allocated: f64 = lots.iter().map(|l| l.quantity_to_sell).sum();
    if (allocated - declared).abs() > QUANTITY_EPSILON {
        return Err(LotError::AllocationMismatch { declared, allocated });
    }
    Ok(())
}

/// Splits `quantity` across `lots` oldest first.
pub fn allocate_fifo(ticker: &str, lots: &[OpenLot], quantity: f64) -> Result<Vec<LotAllocation>, LotError> {
    if !(quantity > 0.0) {
        return Err(LotError::NonPositiveQuantity);
    }

    let mut ordered: Vec<&OpenLot> = lots.iter().filter(|l| l.quantity_remaining > 0.0).collect();
    ordered.sort_by(|a, b| {
        a.transaction_date
            .cmp(&b.transaction_date)
            .then(a.created_at.cmp(&b.created_at))
    });

    let available: f64 = ordered.iter().map(|l| l.quantity_remaining).sum();
    if quantity > available + QUANTITY_EPSILON {
        return Err(LotError::InsufficientOpenQuantity {
            ticker: ticker.to_string(),
            requested: quantity,
            available,
        });
    }

    let mut left = quantity;
    let mut allocations = Vec::new();
    for lot in ordered {
        if left <= QUANTITY_EPSILON {
            break;
        }
        let take = left.min(lot.quantity_remaining);
        allocations.push(LotAllocation {
            parent_buy_id: lot.id,
            quantity_to_sell: take,
        });
        left -= take;
    }
    Ok(allocations)
}

/// Σ(price × qty) / Σ qty over the given lots; `None` when nothing is held.
pub fn weighted_average_cost<I>(lots: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (cost, qty) = lots
        .into_iter()
        .fold((0.0, 0.0), |(cost, qty), (price, quantity)| (cost + price * quantity, qty + quantity));
    if qty > 0.0 {
        Some(cost / qty)
    } else {
        None
    }
}

/// New `(original_quantity, quantity_remaining)` after a BUY's quantity is edited.
pub fn rebase_lot_quantity(
    original_quantity: f64,
    quantity_remaining: f64,
    new_quantity: f64,
) -> Result<(f64, f64), LotError> {
    if !(new_quantity > 0.0) {
        return Err(LotError::NonPositiveQuantity);
    }
    let sold = original_quantity - quantity_remaining;
    let new_remaining = new_quantity - sold;
    if new_remaining < -QUANTITY_EPSILON {
        return Err(LotError::QuantityBelowSold { new_quantity, sold });
    }
    Ok((new_quantity, new_remaining.max(0.0)))
}

/// Checks an edit to a SELL drawn from `parent` and returns how much more
/// the lot gives up (negative when shares go back to it).
pub fn validate_sell_edit(
    parent: &Transaction,
    current_quantity: f64,
    new_quantity: f64,
    new_date: NaiveDate,
) -> Result<f64, LotError> {
    if !(new_quantity > 0.0) {
        return Err(LotError::NonPositiveQuantity);
    }
    let delta = new_quantity - current_quantity;
    if delta > parent.remaining() + QUANTITY_EPSILON {
        return Err(LotError::InsufficientQuantity {
            lot_id: parent.id,
            requested: new_quantity,
            available: parent.remaining() + current_quantity,
        });
    }
    if new_date < parent.transaction_date {
        return Err(LotError::SellBeforeBuy {
            lot_id: parent.id,
            sell_date: new_date,
            buy_date: parent.transaction_date,
        });
    }
    Ok(delta)
}

/// A BUY cannot be moved past the earliest sale drawn from it.
pub fn validate_lot_redate(lot_id: Uuid, new_date: NaiveDate, earliest_sale: Option<NaiveDate>) -> Result<(), LotError> {
    match earliest_sale {
        Some(sell_date) if new_date > sell_date => Err(LotError::SellBeforeBuy {
            lot_id,
            sell_date,
            buy_date: new_date,
        }),
        _ => Ok(()),
    }
}

/// Remaining quantity of a lot at the end of `as_of`, given its SELL children.
pub fn remaining_as_of(current_remaining: f64, sells: &[(NaiveDate, f64)], as_of: NaiveDate) -> f64 {
    let sold_later: f64 = sells
        .iter()
        .filter(|(date, _)| *date > as_of)
        .map(|(_, qty)| qty)
        .sum();
    current_remaining + sold_later
}

/// Which side of a lot's limit band was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    TakeProfit,
    StopLoss,
}

impl std::fmt::Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitKind::TakeProfit => write!(f, "take-profit"),
            LimitKind::StopLoss => write!(f, "stop-loss"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitTrigger {
    pub kind: LimitKind,
    /// The limit the sell executes at.
    pub limit_price: f64,
}

fn limit_live(expiration: Option<NaiveDate>, today: NaiveDate) -> bool {
    expiration.map_or(true, |exp| exp >= today)
}

/// The limit `price` crosses on an open lot, if any. Take-profit wins when
/// a misconfigured band lets both fire.
pub fn limit_trigger(lot: &Transaction, price: f64, today: NaiveDate) -> Option<LimitTrigger> {
    if lot.transaction_type != TransactionType::Buy || lot.remaining() <= QUANTITY_EPSILON {
        return None;
    }
    if let Some(up) = lot.limit_price_up {
        if price >= up && limit_live(lot.limit_up_expiration, today) {
            return Some(LimitTrigger { kind: LimitKind::TakeProfit, limit_price: up });
        }
    }
    if let Some(down) = lot.limit_price_down {
        if price <= down && limit_live(lot.limit_down_expiration, today) {
            return Some(LimitTrigger { kind: LimitKind::StopLoss, limit_price: down });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn buy_lot(quantity: f64, remaining: f64, price: f64, on: NaiveDate) -> Transaction {
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
            quantity_remaining: Some(remaining),
            parent_buy_id: None,
            limit_price_up: None,
            limit_price_down: None,
            limit_up_expiration: None,
            limit_down_expiration: None,
            advice_source_id: None,
            linked_journal_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn sell(quantity: f64, on: NaiveDate) -> SellRequest<'static> {
        SellRequest {
            account_holder_id: Uuid::nil(),
            ticker: "AAPL",
            quantity,
            sell_date: on,
        }
    }

    #[test]
    fn test_realized_pl_on_partial_sell() {
        assert_eq!(realized_pl(120.0, 100.0, 8.0), 160.0);
    }

    #[test]
    fn test_sell_within_remaining_passes() {
        let lot = buy_lot(10.0, 10.0, 100.0, date(2024, 3, 1));
        assert!(validate_sell_against_parent(&lot, &sell(8.0, date(2024, 3, 5))).is_ok());
        assert!(validate_sell_against_parent(&lot, &sell(10.0, date(2024, 3, 1))).is_ok());
    }

    #[test]
    fn test_oversell_is_rejected() {
        let lot = buy_lot(10.0, 2.0, 100.0, date(2024, 3, 1));
        let err = validate_sell_against_parent(&lot, &sell(3.0, date(2024, 3, 5))).unwrap_err();
        assert!(matches!(err, LotError::InsufficientQuantity { available, .. } if available == 2.0));
    }

    #[test]
    fn test_sell_before_buy_is_rejected() {
        let lot = buy_lot(10.0, 10.0, 100.0, date(2024, 3, 1));
        let err = validate_sell_against_parent(&lot, &sell(1.0, date(2024, 2, 28))).unwrap_err();
        assert!(matches!(err, LotError::SellBeforeBuy { .. }));
    }

    #[test]
    fn test_sell_against_other_ticker_or_holder_is_rejected() {
        let lot = buy_lot(10.0, 10.0, 100.0, date(2024, 3, 1));
        let wrong_ticker = SellRequest { ticker: "MSFT", ..sell(1.0, date(2024, 3, 2)) };
        assert!(matches!(
            validate_sell_against_parent(&lot, &wrong_ticker),
            Err(LotError::TickerMismatch { .. })
        ));
        let wrong_holder = SellRequest { account_holder_id: Uuid::new_v4(), ..sell(1.0, date(2024, 3, 2)) };
        assert!(matches!(
            validate_sell_against_parent(&lot, &wrong_holder),
            Err(LotError::HolderMismatch(_))
        ));
    }

    #[test]
    fn test_allocation_total_uses_tolerance() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lots = vec![
            LotAllocation { parent_buy_id: a, quantity_to_sell: 0.1 },
            LotAllocation { parent_buy_id: b, quantity_to_sell: 0.2 },
        ];
        // 0.1 + 0.2 != 0.3 in binary floating point
        assert!(validate_allocation_total(0.3, &lots).is_ok());
        assert!(matches!(
            validate_allocation_total(0.31, &lots),
            Err(LotError::AllocationMismatch { .. })
        ));
    }

    #[test]
    fn test_allocation_rejects_duplicates_and_empty() {
        let a = Uuid::new_v4();
        let lots = vec![
            LotAllocation { parent_buy_id: a, quantity_to_sell: 1.0 },
            LotAllocation { parent_buy_id: a, quantity_to_sell: 1.0 },
        ];
        assert_eq!(validate_allocation_total(2.0, &lots), Err(LotError::DuplicateAllocation(a)));
        assert_eq!(validate_allocation_total(2.0, &[]), Err(LotError::EmptyAllocation));
    }

    #[test]
    fn test_fifo_consumes_oldest_first() {
        let older = OpenLot::from(&buy_lot(5.0, 5.0, 90.0, date(2024, 1, 2)));
        let newer = OpenLot::from(&buy_lot(10.0, 10.0, 110.0, date(2024, 2, 2)));
        let allocations = allocate_fifo("AAPL", &[newer.clone(), older.clone()], 7.0).unwrap();
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].parent_buy_id, older.id);
        assert_eq!(allocations[0].quantity_to_sell, 5.0);
        assert_eq!(allocations[1].parent_buy_id, newer.id);
        assert_eq!(allocations[1].quantity_to_sell, 2.0);
    }

    #[test]
    fn test_fifo_fails_when_short() {
        let lot = OpenLot::from(&buy_lot(5.0, 3.0, 90.0, date(2024, 1, 2)));
        assert!(matches!(
            allocate_fifo("AAPL", &[lot], 4.0),
            Err(LotError::InsufficientOpenQuantity { .. })
        ));
    }

    #[test]
    fn test_weighted_average_cost() {
        let avg = weighted_average_cost(vec![(10.0, 100.0), (12.0, 50.0)]).unwrap();
        assert!((avg - 1600.0 / 150.0).abs() < 1e-9);
        assert!((avg - 10.67).abs() < 0.01);
        assert_eq!(weighted_average_cost(Vec::<(f64, f64)>::new()), None);
    }

    #[test]
    fn test_rebase_keeps_sold_shares() {
        assert_eq!(rebase_lot_quantity(10.0, 4.0, 12.0).unwrap(), (12.0, 6.0));
        assert!(matches!(
            rebase_lot_quantity(10.0, 4.0, 5.0),
            Err(LotError::QuantityBelowSold { .. })
        ));
    }

    #[test]
    fn test_sell_edit_returns_delta_against_lot() {
        // 10 bought, 4 sold in this SELL, 6 still open
        let lot = buy_lot(10.0, 6.0, 100.0, date(2024, 1, 2));
        assert_eq!(validate_sell_edit(&lot, 4.0, 10.0, date(2024, 1, 5)).unwrap(), 6.0);
        assert_eq!(validate_sell_edit(&lot, 4.0, 1.0, date(2024, 1, 5)).unwrap(), -3.0);
        assert!(matches!(
            validate_sell_edit(&lot, 4.0, 10.5, date(2024, 1, 5)),
            Err(LotError::InsufficientQuantity { available, .. }) if available == 10.0
        ));
    }

    #[test]
    fn test_sell_edit_cannot_move_before_buy() {
        let lot = buy_lot(10.0, 6.0, 100.0, date(2024, 1, 2));
        assert!(matches!(
            validate_sell_edit(&lot, 4.0, 4.0, date(2024, 1, 1)),
            Err(LotError::SellBeforeBuy { .. })
        ));
        assert_eq!(
            validate_sell_edit(&lot, 4.0, 0.0, date(2024, 1, 5)),
            Err(LotError::NonPositiveQuantity)
        );
    }

    #[test]
    fn test_lot_cannot_be_redated_past_its_sales() {
        let id = Uuid::new_v4();
        let first_sale = Some(date(2024, 1, 10));
        assert!(validate_lot_redate(id, date(2024, 1, 10), first_sale).is_ok());
        assert!(validate_lot_redate(id, date(2023, 12, 1), first_sale).is_ok());
        assert!(validate_lot_redate(id, date(2024, 2, 1), None).is_ok());
        assert!(matches!(
            validate_lot_redate(id, date(2024, 2, 1), first_sale),
            Err(LotError::SellBeforeBuy { buy_date, .. }) if buy_date == date(2024, 2, 1)
        ));
    }

    #[test]
    fn test_remaining_as_of_adds_back_later_sells() {
        let sells = vec![(date(2024, 3, 1), 2.0), (date(2024, 3, 10), 3.0)];
        assert_eq!(remaining_as_of(5.0, &sells, date(2024, 3, 5)), 8.0);
        assert_eq!(remaining_as_of(5.0, &sells, date(2024, 3, 10)), 5.0);
        assert_eq!(remaining_as_of(5.0, &sells, date(2024, 2, 1)), 10.0);
    }

    #[test]
    fn test_limit_trigger_fires_on_either_side() {
        let mut lot = buy_lot(10.0, 10.0, 100.0, date(2024, 1, 2));
        lot.limit_price_up = Some(120.0);
        lot.limit_price_down = Some(90.0);
        let today = date(2024, 3, 1);

        assert_eq!(limit_trigger(&lot, 105.0, today), None);
        assert_eq!(
            limit_trigger(&lot, 121.0, today),
            Some(LimitTrigger { kind: LimitKind::TakeProfit, limit_price: 120.0 })
        );
        assert_eq!(
            limit_trigger(&lot, 90.0, today),
            Some(LimitTrigger { kind: LimitKind::StopLoss, limit_price: 90.0 })
        );
    }

    #[test]
    fn test_expired_or_closed_lots_do_not_trigger() {
        let mut lot = buy_lot(10.0, 10.0, 100.0, date(2024, 1, 2));
        lot.limit_price_up = Some(120.0);
        lot.limit_up_expiration = Some(date(2024, 2, 28));
        assert_eq!(limit_trigger(&lot, 130.0, date(2024, 3, 1)), None);
        assert!(limit_trigger(&lot, 130.0, date(2024, 2, 28)).is_some());

        let mut sold_out = buy_lot(10.0, 0.0, 100.0, date(2024, 1, 2));
        sold_out.limit_price_down = Some(90.0);
        assert_eq!(limit_trigger(&sold_out, 50.0, date(2024, 3, 1)), None);
    }
}
