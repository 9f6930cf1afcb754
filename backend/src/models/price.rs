use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

/// Result of a quote lookup. Failures are values, not errors: every caller
/// has to decide what a missing price means for its arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceValue {
    Price(f64),
    /// Provider answered but the quote was non-positive or the symbol is unknown.
    Invalid,
    /// Transport, HTTP or parse failure.
    Error,
    /// No provider configured.
    Unavailable,
}

impl PriceValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PriceValue::Price(p) => Some(*p),
            _ => None,
        }
    }

    pub fn or(&self, fallback: f64) -> f64 {
        self.as_f64().unwrap_or(fallback)
    }
}

impl Serialize for PriceValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PriceValue::Price(p) => serializer.serialize_f64(*p),
            PriceValue::Invalid => serializer.serialize_str("invalid"),
            PriceValue::Error => serializer.serialize_str("error"),
            PriceValue::Unavailable => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PriceQuote {
    pub price: PriceValue,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchPriceRequest {
    pub tickers: Vec<String>,
    pub priority: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoricalPrice {
    pub ticker: String,
    pub date: NaiveDate,
    pub close_price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_serialize_as_strings_and_null() {
        assert_eq!(serde_json::to_string(&PriceValue::Price(12.5)).unwrap(), "12.5");
        assert_eq!(serde_json::to_string(&PriceValue::Invalid).unwrap(), "\"invalid\"");
        assert_eq!(serde_json::to_string(&PriceValue::Error).unwrap(), "\"error\"");
        assert_eq!(serde_json::to_string(&PriceValue::Unavailable).unwrap(), "null");
    }

    #[test]
    fn fallback_only_applies_to_sentinels() {
        assert_eq!(PriceValue::Price(10.0).or(5.0), 10.0);
        assert_eq!(PriceValue::Error.or(5.0), 5.0);
        assert_eq!(PriceValue::Invalid.as_f64(), None);
    }
}
