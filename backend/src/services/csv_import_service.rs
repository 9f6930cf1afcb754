use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use dashmap::DashMap;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{account_queries, transaction_queries};
use crate::errors::AppError;
use crate::models::{
    ImportAction, ImportRequest, ImportRow, ImportRowStatus, ImportSession, ImportSummary, NewTransaction,
    Transaction, TransactionType,
};
use crate::services::import_templates::{find_template, ImportTemplate};
use crate::services::transaction_service;
use crate::utils::QUANTITY_EPSILON;

/// Prices within this many dollars count as the same fill.
pub const DUPLICATE_PRICE_TOLERANCE: f64 = 0.02;

const FALLBACK_EXCHANGE: &str = "UNKNOWN";

/// How long an uploaded file waits for its import before it is dropped.
pub const SESSION_TTL_MINUTES: i64 = 60;

/// Uploaded files waiting for the user to resolve duplicates.
///
/// Sessions older than the TTL are invisible to `get` and swept on `insert`.
pub struct ImportSessions {
    sessions: DashMap<Uuid, ImportSession>,
    ttl: chrono::Duration,
}

impl Default for ImportSessions {
    fn default() -> Self {
        Self::with_ttl(chrono::Duration::minutes(SESSION_TTL_MINUTES))
    }
}

impl ImportSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: chrono::Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    pub fn insert(&self, session: ImportSession) {
        self.sweep_expired();
        self.sessions.insert(session.id, session);
    }

    pub fn get(&self, id: Uuid) -> Option<ImportSession> {
        self.sessions
            .get(&id)
            .filter(|s| !self.is_expired(s))
            .map(|s| s.clone())
    }

    pub fn remove(&self, id: Uuid) -> Option<ImportSession> {
        self.sessions.remove(&id).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn is_expired(&self, session: &ImportSession) -> bool {
        Utc::now() - session.created_at > self.ttl
    }

    fn sweep_expired(&self) {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !self.is_expired(s));
        let dropped = before.saturating_sub(self.sessions.len());
        if dropped > 0 {
            info!("🧹 Dropped {} expired import session(s)", dropped);
        }
    }
}

#[derive(Debug, Default)]
pub struct ParsedImport {
    pub rows: Vec<ImportRow>,
    pub errors: Vec<String>,
}

/// Reads a money or quantity cell: `$1,234.50`, `(12)`, `-3`. Blank is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => inner.parse::<f64>().ok().map(|v| -v),
        None => cleaned.parse::<f64>().ok(),
    }
}

fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    let raw = raw.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .with_context(|| format!("Column '{}' not found in CSV header", name))
}

fn optional_column(headers: &StringRecord, name: Option<&String>) -> Option<usize> {
    name.and_then(|n| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(n)))
}

/// Maps a brokerage export onto import rows. Bad rows are reported, not fatal;
/// a missing required column is.
pub fn parse_csv(content: &[u8], template: &ImportTemplate, default_exchange: Option<&str>) -> Result<ParsedImport> {
    let skip = template
        .skip_row_pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .with_context(|| format!("Invalid skip pattern in template {}", template.name))?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let map = &template.column_map;
    let cols = RecordColumns {
        date: column(&headers, &map.date)?,
        ticker: column(&headers, &map.ticker)?,
        kind: column(&headers, &map.transaction_type)?,
        quantity: column(&headers, &map.quantity)?,
        price: column(&headers, &map.price)?,
        exchange: optional_column(&headers, map.exchange.as_ref()),
        amount: optional_column(&headers, map.amount.as_ref()),
    };

    let default_exchange = default_exchange
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(FALLBACK_EXCHANGE)
        .to_uppercase();

    let mut parsed = ParsedImport::default();

    for (i, record) in reader.records().enumerate() {
        let line = i + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                parsed.errors.push(format!("Line {}: Failed to parse CSV row: {}", line, e));
                continue;
            }
        };

        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let joined = record.iter().collect::<Vec<_>>().join(",");
        if skip.as_ref().map_or(false, |re| re.is_match(&joined)) {
            continue;
        }

        match parse_record(&record, template, &cols, &default_exchange) {
            Ok(mut row) => {
                row.row_index = parsed.rows.len();
                parsed.rows.push(row);
            }
            Err(e) => parsed.errors.push(format!("Line {}: {}", line, e)),
        }
    }

    Ok(parsed)
}

struct RecordColumns {
    date: usize,
    ticker: usize,
    kind: usize,
    quantity: usize,
    price: usize,
    exchange: Option<usize>,
    amount: Option<usize>,
}

fn parse_record(
    record: &StringRecord,
    template: &ImportTemplate,
    cols: &RecordColumns,
    default_exchange: &str,
) -> Result<ImportRow> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let raw_type = field(cols.kind);
    let Some(transaction_type) = template.map_type(raw_type) else {
        bail!("Unrecognised action '{}'", raw_type);
    };

    let transaction_date = parse_date(field(cols.date), &template.date_formats)
        .with_context(|| format!("Unparseable date '{}'", field(cols.date)))?;

    let ticker = template.ticker_transform.apply(field(cols.ticker));
    if ticker.is_empty() {
        bail!("Missing ticker");
    }

    let mut quantity = parse_number(field(cols.quantity)).map(f64::abs);
    let mut price = parse_number(field(cols.price)).map(f64::abs);

    // Dividends often only carry the cash amount
    if transaction_type == TransactionType::Dividend && (quantity.is_none() || price.is_none()) {
        if let Some(amount) = cols.amount.and_then(|idx| parse_number(field(idx))) {
            quantity = Some(1.0);
            price = Some(amount.abs());
        }
    }

    let quantity = quantity.with_context(|| format!("Invalid quantity '{}'", field(cols.quantity)))?;
    let price = price.with_context(|| format!("Invalid price '{}'", field(cols.price)))?;
    if quantity <= 0.0 {
        bail!("Quantity must be greater than 0");
    }

    let exchange = cols
        .exchange
        .map(|idx| field(idx).trim().to_uppercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| default_exchange.to_string());

    Ok(ImportRow {
        row_index: 0,
        transaction_date,
        ticker,
        exchange,
        transaction_type,
        quantity,
        price,
        status: ImportRowStatus::New,
        conflict_transaction_id: None,
    })
}

/// Flags rows that look like a transaction already in the ledger.
///
/// An imported SELL lands as one row per FIFO lot, so a SELL also matches
/// when the same-day, same-price SELLs in the ledger add up to its quantity.
pub fn reconcile(rows: &mut [ImportRow], existing: &[Transaction]) {
    let same_fill = |t: &Transaction, row: &ImportRow| {
        t.transaction_date == row.transaction_date
            && t.ticker == row.ticker
            && t.transaction_type == row.transaction_type
            && (t.price - row.price).abs() <= DUPLICATE_PRICE_TOLERANCE + 1e-9
    };

    for row in rows.iter_mut() {
        let exact = existing
            .iter()
            .find(|t| same_fill(t, row) && (t.quantity - row.quantity).abs() <= QUANTITY_EPSILON);
        let conflict = exact.or_else(|| {
            if row.transaction_type != TransactionType::Sell {
                return None;
            }
            let slices: Vec<&Transaction> = existing.iter().filter(|t| same_fill(t, row)).collect();
            let total: f64 = slices.iter().map(|t| t.quantity).sum();
            if slices.len() > 1 && (total - row.quantity).abs() <= QUANTITY_EPSILON {
                slices.first().copied()
            } else {
                None
            }
        });

        match conflict {
            Some(t) => {
                row.status = ImportRowStatus::PotentialDuplicate;
                row.conflict_transaction_id = Some(t.id);
            }
            None => {
                row.status = ImportRowStatus::New;
                row.conflict_transaction_id = None;
            }
        }
    }
}

/// Rows to write, in the order they hit the ledger: by date, buys before sells.
pub fn rows_to_import(session: &ImportSession, request: &ImportRequest) -> Result<Vec<ImportRow>, AppError> {
    let mut overrides = HashMap::new();
    for resolution in &request.resolutions {
        if resolution.row_index >= session.rows.len() {
            return Err(AppError::validation(format!(
                "Resolution for unknown row {}",
                resolution.row_index
            )));
        }
        overrides.insert(resolution.row_index, resolution.action);
    }

    let mut chosen: Vec<ImportRow> = session
        .rows
        .iter()
        .filter(|row| {
            let default = match row.status {
                ImportRowStatus::New => ImportAction::Import,
                ImportRowStatus::PotentialDuplicate => ImportAction::Skip,
            };
            overrides.get(&row.row_index).copied().unwrap_or(default) == ImportAction::Import
        })
        .cloned()
        .collect();

    let rank = |t: TransactionType| match t {
        TransactionType::Buy => 0,
        TransactionType::Dividend => 1,
        TransactionType::Sell => 2,
    };
    chosen.sort_by_key(|r| (r.transaction_date, rank(r.transaction_type), r.row_index));
    Ok(chosen)
}

pub async fn upload(
    pool: &PgPool,
    sessions: &ImportSessions,
    account_holder_id: Uuid,
    template_name: &str,
    default_exchange: Option<&str>,
    content: &[u8],
) -> Result<ImportSession, AppError> {
    let template = find_template(template_name)
        .ok_or_else(|| AppError::validation(format!("Unknown import template '{}'", template_name)))?;

    if account_queries::fetch_holder(pool, account_holder_id).await?.is_none() {
        return Err(AppError::validation(format!(
            "Account holder {} does not exist",
            account_holder_id
        )));
    }

    let ParsedImport { mut rows, errors } =
        parse_csv(content, &template, default_exchange).map_err(|e| AppError::validation(format!("{:#}", e)))?;

    let first = rows.iter().map(|r| r.transaction_date).min();
    let last = rows.iter().map(|r| r.transaction_date).max();
    if let (Some(first), Some(last)) = (first, last) {
        let existing = transaction_queries::fetch_between(pool, account_holder_id, first, last).await?;
        reconcile(&mut rows, &existing);
    }

    let duplicates = rows
        .iter()
        .filter(|r| r.status == ImportRowStatus::PotentialDuplicate)
        .count();
    if !errors.is_empty() {
        warn!("⚠️ {} line(s) of the {} upload could not be parsed", errors.len(), template.name);
    }

    let session = ImportSession {
        id: Uuid::new_v4(),
        account_holder_id,
        template: template.name.clone(),
        rows,
        errors,
        created_at: Utc::now(),
    };
    info!(
        "📥 Import session {}: {} rows ({} potential duplicates)",
        session.id,
        session.rows.len(),
        duplicates
    );
    sessions.insert(session.clone());
    Ok(session)
}

fn with_row(row: &ImportRow, e: AppError) -> AppError {
    match e {
        AppError::Validation(msg) => AppError::Validation(format!("Row {} ({}): {}", row.row_index, row.ticker, msg)),
        other => other,
    }
}

/// Writes the chosen rows in one transaction; nothing lands if any row fails.
pub async fn commit(pool: &PgPool, sessions: &ImportSessions, request: ImportRequest) -> Result<ImportSummary, AppError> {
    let session = sessions
        .get(request.session_id)
        .ok_or_else(|| AppError::not_found(format!("Import session {} not found", request.session_id)))?;
    let chosen = rows_to_import(&session, &request)?;

    let mut summary = ImportSummary {
        skipped: session.rows.len() - chosen.len(),
        ..ImportSummary::default()
    };

    let mut tx = pool.begin().await?;
    let holder = session.account_holder_id;

    for row in &chosen {
        match row.transaction_type {
            TransactionType::Buy => {
                let new = NewTransaction::buy(
                    holder,
                    row.ticker.clone(),
                    row.exchange.clone(),
                    row.quantity,
                    row.price,
                    row.transaction_date,
                );
                transaction_service::insert_buy(&mut tx, &new).await.map_err(|e| with_row(row, e))?;
                summary.buys += 1;
            }
            TransactionType::Sell => {
                transaction_service::apply_fifo_sell(
                    &mut tx,
                    holder,
                    &row.ticker,
                    row.quantity,
                    row.price,
                    row.transaction_date,
                )
                .await
                .map_err(|e| with_row(row, e))?;
                summary.sells += 1;
            }
            TransactionType::Dividend => {
                let new = NewTransaction::dividend(
                    holder,
                    row.ticker.clone(),
                    row.exchange.clone(),
                    row.quantity,
                    row.price,
                    row.transaction_date,
                );
                transaction_queries::insert(&mut *tx, &new).await?;
                summary.dividends += 1;
            }
        }
        summary.imported += 1;
    }

    tx.commit().await?;
    sessions.remove(session.id);
    info!(
        "✅ Import session {} committed: {} imported, {} skipped",
        session.id, summary.imported, summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(age_minutes: i64) -> ImportSession {
        ImportSession {
            id: Uuid::new_v4(),
            account_holder_id: Uuid::nil(),
            template: "generic".to_string(),
            rows: Vec::new(),
            errors: Vec::new(),
            created_at: Utc::now() - chrono::Duration::minutes(age_minutes),
        }
    }

    #[test]
    fn test_expired_sessions_are_swept_on_insert() {
        let sessions = ImportSessions::new();
        let stale = session(SESSION_TTL_MINUTES + 5);
        let stale_id = stale.id;
        sessions.sessions.insert(stale.id, stale);

        let fresh = session(0);
        let fresh_id = fresh.id;
        sessions.insert(fresh);

        assert_eq!(sessions.len(), 1);
        assert!(sessions.get(stale_id).is_none());
        assert!(sessions.get(fresh_id).is_some());
    }

    #[test]
    fn test_expired_session_is_not_returned() {
        let sessions = ImportSessions::with_ttl(chrono::Duration::minutes(10));
        let old = session(11);
        let id = old.id;
        sessions.sessions.insert(id, old);
        assert!(sessions.get(id).is_none());
    }
}
