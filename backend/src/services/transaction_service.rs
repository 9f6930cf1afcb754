use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{account_queries, order_queries, transaction_queries, watchlist_queries};
use crate::domain::{self, LimitKind, LimitTrigger, LotError, OpenLot, SellRequest};
use crate::errors::AppError;
use crate::models::{
    CreateTransaction, CreatedTransactions, LotAllocation, NewTransaction, SaleWithPl, Transaction,
    TransactionQuery, TransactionType, UpdateTransaction,
};
use crate::utils::{format_accounting, normalize_exchange, normalize_ticker, QUANTITY_EPSILON};

pub async fn list(pool: &PgPool, query: TransactionQuery) -> Result<Vec<Transaction>, AppError> {
    let ticker = query.ticker.as_deref().map(normalize_ticker);
    Ok(transaction_queries::fetch_all(pool, query.holder, ticker.as_deref()).await?)
}

pub async fn fetch_one(pool: &PgPool, id: Uuid) -> Result<Transaction, AppError> {
    transaction_queries::fetch_one(pool, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Transaction {} not found", id)))
}

/// SELLs drawn from a BUY lot, each with its realized P/L.
pub async fn sales(pool: &PgPool, id: Uuid) -> Result<Vec<SaleWithPl>, AppError> {
    let lot = fetch_one(pool, id).await?;
    if lot.transaction_type != TransactionType::Buy {
        return Err(LotError::ParentNotBuy(id).into());
    }
    Ok(transaction_queries::fetch_sales(pool, id).await?)
}

pub async fn create(pool: &PgPool, input: CreateTransaction) -> Result<CreatedTransactions, AppError> {
    let ticker = normalize_ticker(&input.ticker);
    if ticker.is_empty() {
        return Err(AppError::validation("Ticker cannot be empty"));
    }
    if input.exchange.trim().is_empty() {
        return Err(AppError::validation("Exchange cannot be empty"));
    }
    domain::validate_trade_amounts(input.quantity, input.price)?;

    if account_queries::fetch_holder(pool, input.account_holder_id).await?.is_none() {
        return Err(AppError::validation(format!(
            "Account holder {} does not exist",
            input.account_holder_id
        )));
    }

    let mut tx = pool.begin().await?;

    let transactions = match input.transaction_type {
        TransactionType::Buy => {
            let new = NewTransaction {
                limit_price_up: input.limit_price_up,
                limit_price_down: input.limit_price_down,
                limit_up_expiration: input.limit_up_expiration,
                limit_down_expiration: input.limit_down_expiration,
                advice_source_id: input.advice_source_id,
                linked_journal_id: input.linked_journal_id,
                ..NewTransaction::buy(
                    input.account_holder_id,
                    ticker,
                    normalize_exchange(&input.exchange),
                    input.quantity,
                    input.price,
                    input.transaction_date,
                )
            };
            vec![insert_buy(&mut tx, &new).await?]
        }
        TransactionType::Sell => {
            let sell = SellRequest {
                account_holder_id: input.account_holder_id,
                ticker: &ticker,
                quantity: input.quantity,
                sell_date: input.transaction_date,
            };
            match (&input.lots, input.parent_buy_id) {
                (Some(lots), _) => sell_selected_lots(&mut tx, &sell, lots, input.price).await?,
                (None, Some(parent_id)) => vec![sell_from_lot(&mut tx, parent_id, &sell, input.price).await?],
                (None, None) => {
                    return Err(AppError::validation("A SELL needs parent_buy_id or a list of lots"));
                }
            }
        }
        TransactionType::Dividend => {
            let new = NewTransaction {
                advice_source_id: input.advice_source_id,
                ..NewTransaction::dividend(
                    input.account_holder_id,
                    ticker,
                    normalize_exchange(&input.exchange),
                    input.quantity,
                    input.price,
                    input.transaction_date,
                )
            };
            vec![transaction_queries::insert(&mut *tx, &new).await?]
        }
    };

    tx.commit().await?;
    info!(
        "✅ Recorded {} {} row(s) for {}",
        transactions.len(),
        input.transaction_type,
        input.account_holder_id
    );
    Ok(CreatedTransactions { transactions })
}

/// Inserts a BUY lot and archives the watchlist ideas it came from.
pub(crate) async fn insert_buy(conn: &mut PgConnection, new: &NewTransaction) -> Result<Transaction, AppError> {
    let lot = transaction_queries::insert(&mut *conn, new).await?;
    if let Some(source_id) = lot.advice_source_id {
        let archived =
            watchlist_queries::archive_matching(&mut *conn, lot.account_holder_id, &lot.ticker, source_id).await?;
        if archived > 0 {
            info!("📦 Archived {} watchlist item(s) for {} after BUY", archived, lot.ticker);
        }
    }
    Ok(lot)
}

/// Sells from one lot. The lot row stays locked until the caller commits.
pub(crate) async fn sell_from_lot(
    conn: &mut PgConnection,
    parent_id: Uuid,
    sell: &SellRequest<'_>,
    price: f64,
) -> Result<Transaction, AppError> {
    let parent = transaction_queries::fetch_one_for_update(&mut *conn, parent_id)
        .await?
        .ok_or_else(|| AppError::validation(format!("Parent lot {} does not exist", parent_id)))?;
    domain::validate_sell_against_parent(&parent, sell)?;

    let row = transaction_queries::insert(
        &mut *conn,
        &NewTransaction::sell(&parent, sell.quantity, price, sell.sell_date),
    )
    .await?;
    transaction_queries::adjust_remaining(&mut *conn, parent.id, -sell.quantity).await?;
    Ok(row)
}

async fn sell_selected_lots(
    conn: &mut PgConnection,
    sell: &SellRequest<'_>,
    lots: &[LotAllocation],
    price: f64,
) -> Result<Vec<Transaction>, AppError> {
    domain::validate_allocation_total(sell.quantity, lots)?;

    let mut rows = Vec::with_capacity(lots.len());
    for allocation in lots {
        let slice = SellRequest {
            quantity: allocation.quantity_to_sell,
            ..sell.clone()
        };
        rows.push(sell_from_lot(conn, allocation.parent_buy_id, &slice, price).await?);
    }
    Ok(rows)
}

/// Sells `quantity` across the holder's open lots, oldest first.
pub(crate) async fn apply_fifo_sell(
    conn: &mut PgConnection,
    account_holder_id: Uuid,
    ticker: &str,
    quantity: f64,
    price: f64,
    sell_date: NaiveDate,
) -> Result<Vec<Transaction>, AppError> {
    let open = transaction_queries::fetch_open_lots_for_update(&mut *conn, account_holder_id, ticker).await?;
    let candidates: Vec<OpenLot> = open
        .iter()
        .filter(|lot| lot.transaction_date <= sell_date)
        .map(OpenLot::from)
        .collect();

    let allocations = domain::allocate_fifo(ticker, &candidates, quantity)?;
    let sell = SellRequest {
        account_holder_id,
        ticker,
        quantity,
        sell_date,
    };
    sell_selected_lots(conn, &sell, &allocations, price).await
}

pub async fn update(pool: &PgPool, id: Uuid, mut input: UpdateTransaction) -> Result<Transaction, AppError> {
    domain::validate_trade_amounts(input.quantity, input.price)?;
    input.exchange = normalize_exchange(&input.exchange);
    if input.exchange.is_empty() {
        return Err(AppError::validation("Exchange cannot be empty"));
    }

    let mut tx = pool.begin().await?;
    let existing = transaction_queries::fetch_one_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Transaction {} not found", id)))?;

    let (original, remaining) = match existing.transaction_type {
        TransactionType::Buy => {
            if input.transaction_date != existing.transaction_date {
                let earliest_sale = transaction_queries::earliest_sale_date(&mut *tx, id).await?;
                domain::validate_lot_redate(id, input.transaction_date, earliest_sale)?;
            }
            let original = existing.original_quantity.unwrap_or(existing.quantity);
            let (original, remaining) = domain::rebase_lot_quantity(original, existing.remaining(), input.quantity)?;
            (Some(original), Some(remaining))
        }
        TransactionType::Sell => {
            let parent_id = existing
                .parent_buy_id
                .ok_or_else(|| AppError::validation(format!("SELL {} has no parent lot", id)))?;
            let parent = transaction_queries::fetch_one_for_update(&mut *tx, parent_id)
                .await?
                .ok_or_else(|| AppError::validation(format!("Parent lot {} does not exist", parent_id)))?;

            let delta =
                domain::validate_sell_edit(&parent, existing.quantity, input.quantity, input.transaction_date)?;
            if delta.abs() > 0.0 {
                transaction_queries::adjust_remaining(&mut *tx, parent.id, -delta).await?;
            }
            (None, None)
        }
        TransactionType::Dividend => (None, None),
    };

    let updated = transaction_queries::update(&mut *tx, id, &input, original, remaining)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Transaction {} not found", id)))?;
    tx.commit().await?;
    Ok(updated)
}

/// Deletes a row. A SELL gives its quantity back to its lot; a BUY with sales is kept.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    let existing = transaction_queries::fetch_one_for_update(&mut *tx, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Transaction {} not found", id)))?;

    match existing.transaction_type {
        TransactionType::Buy => {
            let sales = transaction_queries::count_sales(&mut *tx, id).await?;
            if sales > 0 {
                return Err(AppError::validation(format!(
                    "Cannot delete lot {}: {} sale(s) reference it",
                    id, sales
                )));
            }
        }
        TransactionType::Sell => {
            if let Some(parent_id) = existing.parent_buy_id {
                transaction_queries::fetch_one_for_update(&mut *tx, parent_id).await?;
                transaction_queries::adjust_remaining(&mut *tx, parent_id, existing.quantity).await?;
            }
        }
        TransactionType::Dividend => {}
    }

    transaction_queries::delete(&mut *tx, id).await?;
    tx.commit().await?;
    info!("🗑️ Deleted {} {} ({})", existing.transaction_type, existing.ticker, id);
    Ok(())
}

/// Sells the whole remaining lot at its crossed limit and clears the band.
///
/// Returns `None` when the lot changed under the watcher: sold out, limits
/// edited or cleared by a concurrent request.
pub(crate) async fn execute_limit_sell(
    pool: &PgPool,
    lot_id: Uuid,
    trigger: LimitTrigger,
    today: NaiveDate,
) -> Result<Option<Transaction>, AppError> {
    let mut tx = pool.begin().await?;
    let Some(lot) = transaction_queries::fetch_one_for_update(&mut *tx, lot_id).await? else {
        return Ok(None);
    };

    let still_armed = match trigger.kind {
        LimitKind::TakeProfit => lot.limit_price_up == Some(trigger.limit_price),
        LimitKind::StopLoss => lot.limit_price_down == Some(trigger.limit_price),
    };
    let quantity = lot.remaining();
    if !still_armed || quantity <= QUANTITY_EPSILON {
        warn!("Lot {} changed before its {} could execute, skipping", lot_id, trigger.kind);
        return Ok(None);
    }

    let sell_date = today.max(lot.transaction_date);
    let sell = transaction_queries::insert(
        &mut *tx,
        &NewTransaction::sell(&lot, quantity, trigger.limit_price, sell_date),
    )
    .await?;
    transaction_queries::adjust_remaining(&mut *tx, lot.id, -quantity).await?;
    transaction_queries::clear_limits(&mut *tx, lot.id).await?;

    let message = format!(
        "{} {} hit: sold {} shares at {} (realized {})",
        lot.ticker,
        trigger.kind,
        quantity,
        format_accounting(trigger.limit_price),
        format_accounting(domain::realized_pl(trigger.limit_price, lot.price, quantity)),
    );
    order_queries::create_notification(&mut *tx, lot.account_holder_id, None, &message).await?;

    tx.commit().await?;
    info!("💸 {}", message);
    Ok(Some(sell))
}
