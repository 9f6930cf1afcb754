use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bad response: {0}")]
    BadResponse(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("rate limited")]
    RateLimited,

    #[error("symbol not found")]
    NotFound,
}

/// A source of last-trade quotes.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Latest price for `ticker`. A non-positive value means the provider
    /// has no usable quote for the symbol.
    async fn fetch_quote(&self, ticker: &str) -> Result<f64, PriceProviderError>;
}

pub(crate) fn http_client() -> Result<reqwest::Client, PriceProviderError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| PriceProviderError::Network(e.to_string()))
}
