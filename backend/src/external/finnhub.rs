use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::external::price_provider::{http_client, PriceProvider, PriceProviderError};

const QUOTE_URL: &str = "https://finnhub.io/api/v1/quote";

pub struct FinnhubProvider {
    client: reqwest::Client,
    api_key: String,
}

impl FinnhubProvider {
    pub fn from_env() -> Result<Self, PriceProviderError> {
        let api_key = std::env::var("FINNHUB_API_KEY")
            .map_err(|_| PriceProviderError::BadResponse("FINNHUB_API_KEY not set".into()))?;

        Ok(Self {
            client: http_client()?,
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FinnhubQuote {
    /// Current price; 0 for unknown symbols
    c: Option<f64>,
}

#[async_trait]
impl PriceProvider for FinnhubProvider {
    fn name(&self) -> &'static str {
        "finnhub"
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<f64, PriceProviderError> {
        let resp = self
            .client
            .get(QUOTE_URL)
            .query(&[("symbol", ticker), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(PriceProviderError::RateLimited),
            status if !status.is_success() => {
                return Err(PriceProviderError::BadResponse(format!("HTTP {}", status)));
            }
            _ => {}
        }

        let quote: FinnhubQuote = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        Ok(quote.c.unwrap_or(0.0))
    }
}
