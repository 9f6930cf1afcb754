use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::Writer;
use sqlx::PgPool;
use tracing::info;

use crate::db::transaction_queries;
use crate::models::Transaction;

pub fn backup_file_name(date: NaiveDate) -> String {
    format!("transactions-{}.csv", date.format("%Y%m%d"))
}

/// Serializes ledger rows with a header line; returns the row count.
pub fn write_ledger<W: std::io::Write>(writer: W, rows: &[Transaction]) -> Result<usize> {
    let mut csv = Writer::from_writer(writer);
    for row in rows {
        csv.serialize(row)
            .with_context(|| format!("Failed to write transaction {}", row.id))?;
    }
    csv.flush().context("Failed to flush backup file")?;
    Ok(rows.len())
}

/// Writes the whole ledger to `dir/transactions-YYYYMMDD.csv`, replacing any
/// earlier export from the same day.
pub async fn export_ledger(pool: &PgPool, dir: &Path, date: NaiveDate) -> Result<(PathBuf, usize)> {
    let rows = transaction_queries::fetch_ledger(pool)
        .await
        .context("Failed to load transactions for backup")?;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create backup directory {:?}", dir))?;
    let path = dir.join(backup_file_name(date));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create backup file {:?}", path))?;

    let count = write_ledger(file, &rows)?;
    info!("💾 Backed up {} transactions to {:?}", count, path);
    Ok((path, count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_backup_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();
        assert_eq!(backup_file_name(date), "transactions-20240704.csv");
    }

    #[test]
    fn test_write_ledger_emits_header_and_rows() {
        let row = Transaction {
            id: Uuid::new_v4(),
            account_holder_id: Uuid::new_v4(),
            ticker: "AAPL".to_string(),
            exchange: "NASDAQ".to_string(),
            transaction_type: TransactionType::Buy,
            quantity: 10.0,
            price: 185.5,
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            original_quantity: Some(10.0),
            quantity_remaining: Some(4.0),
            parent_buy_id: None,
            limit_price_up: None,
            limit_price_down: None,
            limit_up_expiration: None,
            limit_down_expiration: None,
            advice_source_id: None,
            linked_journal_id: None,
            created_at: Utc::now(),
        };

        let mut out = Vec::new();
        let count = write_ledger(&mut out, &[row]).unwrap();
        assert_eq!(count, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("id,account_holder_id,ticker,exchange,transaction_type"));
        assert!(lines.next().unwrap().contains(",AAPL,NASDAQ,BUY,10.0,185.5,2024-01-02,"));
        assert!(lines.next().is_none());
    }
}
