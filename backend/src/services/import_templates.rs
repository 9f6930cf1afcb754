use serde::Serialize;

use crate::models::TransactionType;

/// Header names a template reads from.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnMap {
    pub date: String,
    pub ticker: String,
    pub transaction_type: String,
    pub quantity: String,
    pub price: String,
    pub exchange: Option<String>,
    /// Cash amount, used for dividends that carry no quantity or price.
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerTransform {
    pub trim: bool,
    pub uppercase: bool,
    pub strip_suffixes: Vec<String>,
}

impl TickerTransform {
    pub fn apply(&self, raw: &str) -> String {
        let mut ticker = if self.trim { raw.trim().to_string() } else { raw.to_string() };
        if self.uppercase {
            ticker = ticker.to_uppercase();
        }
        for suffix in &self.strip_suffixes {
            if let Some(stripped) = ticker.strip_suffix(suffix.as_str()) {
                ticker = stripped.to_string();
                break;
            }
        }
        ticker
    }
}

/// How one brokerage lays out its activity export.
#[derive(Debug, Clone, Serialize)]
pub struct ImportTemplate {
    pub name: String,
    pub description: String,
    pub column_map: ColumnMap,
    /// chrono formats, tried in order.
    pub date_formats: Vec<String>,
    /// Action prefix → transaction type, matched case-insensitively.
    pub type_map: Vec<(String, TransactionType)>,
    pub ticker_transform: TickerTransform,
    /// Rows whose comma-joined fields match this regex are dropped silently.
    pub skip_row_pattern: Option<String>,
}

impl ImportTemplate {
    pub fn map_type(&self, raw: &str) -> Option<TransactionType> {
        let value = raw.trim().to_uppercase();
        self.type_map
            .iter()
            .find(|(prefix, _)| value.starts_with(&prefix.to_uppercase()))
            .map(|(_, kind)| *kind)
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn generic() -> ImportTemplate {
    ImportTemplate {
        name: "generic".to_string(),
        description: "Date,Ticker,Type,Quantity,Price[,Exchange]".to_string(),
        column_map: ColumnMap {
            date: "Date".to_string(),
            ticker: "Ticker".to_string(),
            transaction_type: "Type".to_string(),
            quantity: "Quantity".to_string(),
            price: "Price".to_string(),
            exchange: Some("Exchange".to_string()),
            amount: None,
        },
        date_formats: strings(&["%Y-%m-%d", "%m/%d/%Y"]),
        type_map: vec![
            ("BUY".to_string(), TransactionType::Buy),
            ("SELL".to_string(), TransactionType::Sell),
            ("DIVIDEND".to_string(), TransactionType::Dividend),
        ],
        ticker_transform: TickerTransform {
            trim: true,
            uppercase: true,
            strip_suffixes: Vec::new(),
        },
        skip_row_pattern: None,
    }
}

fn fidelity() -> ImportTemplate {
    ImportTemplate {
        name: "fidelity".to_string(),
        description: "Fidelity account history export".to_string(),
        column_map: ColumnMap {
            date: "Run Date".to_string(),
            ticker: "Symbol".to_string(),
            transaction_type: "Action".to_string(),
            quantity: "Quantity".to_string(),
            price: "Price ($)".to_string(),
            exchange: None,
            amount: Some("Amount ($)".to_string()),
        },
        date_formats: strings(&["%m/%d/%Y"]),
        type_map: vec![
            ("YOU BOUGHT".to_string(), TransactionType::Buy),
            ("YOU SOLD".to_string(), TransactionType::Sell),
            ("DIVIDEND RECEIVED".to_string(), TransactionType::Dividend),
        ],
        ticker_transform: TickerTransform {
            trim: true,
            uppercase: true,
            strip_suffixes: Vec::new(),
        },
        skip_row_pattern: Some(r"(?i)^(the data and information|brokerage services|date downloaded|,*$)|REINVESTMENT".to_string()),
    }
}

fn robinhood() -> ImportTemplate {
    ImportTemplate {
        name: "robinhood".to_string(),
        description: "Robinhood activity report".to_string(),
        column_map: ColumnMap {
            date: "Activity Date".to_string(),
            ticker: "Instrument".to_string(),
            transaction_type: "Trans Code".to_string(),
            quantity: "Quantity".to_string(),
            price: "Price".to_string(),
            exchange: None,
            amount: Some("Amount".to_string()),
        },
        date_formats: strings(&["%m/%d/%Y", "%Y-%m-%d"]),
        type_map: vec![
            ("BUY".to_string(), TransactionType::Buy),
            ("SELL".to_string(), TransactionType::Sell),
            ("CDIV".to_string(), TransactionType::Dividend),
        ],
        ticker_transform: TickerTransform {
            trim: true,
            uppercase: true,
            strip_suffixes: strings(&[".TO", ".V"]),
        },
        skip_row_pattern: Some(r",(ACH|GOLD|INT|SLIP|GDBP|RTP|AFEE|DFEE),".to_string()),
    }
}

pub fn built_in_templates() -> Vec<ImportTemplate> {
    vec![generic(), fidelity(), robinhood()]
}

pub fn find_template(name: &str) -> Option<ImportTemplate> {
    built_in_templates()
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(name.trim()))
}
