use async_trait::async_trait;
use serde::Deserialize;

use crate::external::price_provider::{http_client, PriceProvider, PriceProviderError};

const PRICE_URL: &str = "https://api.twelvedata.com/price";

pub struct TwelveDataProvider {
    client: reqwest::Client,
    api_key: String,
}

impl TwelveDataProvider {
    pub fn from_env() -> Result<Self, PriceProviderError> {
        let api_key = std::env::var("TWELVEDATA_API_KEY")
            .map_err(|_| PriceProviderError::BadResponse("TWELVEDATA_API_KEY not set".into()))?;

        Ok(Self {
            client: http_client()?,
            api_key,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TwelveDataPriceResponse {
    price: Option<String>,

    // Error handling
    status: Option<String>,
    message: Option<String>,
    code: Option<u32>,
}

fn interpret(body: TwelveDataPriceResponse) -> Result<f64, PriceProviderError> {
    if let Some(price) = body.price {
        return price
            .parse::<f64>()
            .map_err(|e| PriceProviderError::Parse(e.to_string()));
    }

    let message = body.message.unwrap_or_default();
    if body.code == Some(429) || message.contains("API rate limit") || message.contains("credits") {
        return Err(PriceProviderError::RateLimited);
    }
    if body.code == Some(404) || message.contains("symbol") {
        return Err(PriceProviderError::NotFound);
    }
    Err(PriceProviderError::BadResponse(format!(
        "API returned status {}: {}",
        body.status.unwrap_or_else(|| "unknown".to_string()),
        message
    )))
}

#[async_trait]
impl PriceProvider for TwelveDataProvider {
    fn name(&self) -> &'static str {
        "twelvedata"
    }

    async fn fetch_quote(&self, ticker: &str) -> Result<f64, PriceProviderError> {
        let resp = self
            .client
            .get(PRICE_URL)
            .query(&[("symbol", ticker), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| PriceProviderError::Network(e.to_string()))?;

        // Twelve Data reports most errors with HTTP 200 and a JSON body
        let body: TwelveDataPriceResponse = resp
            .json()
            .await
            .map_err(|e| PriceProviderError::Parse(e.to_string()))?;

        interpret(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<f64, PriceProviderError> {
        interpret(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_parses_price_string() {
        assert_eq!(parse(r#"{"price":"187.42000"}"#).unwrap(), 187.42);
    }

    #[test]
    fn test_detects_rate_limit() {
        let err = parse(r#"{"code":429,"message":"You have run out of API credits for the current minute.","status":"error"}"#).unwrap_err();
        assert!(matches!(err, PriceProviderError::RateLimited));
    }

    #[test]
    fn test_unknown_symbol_is_not_found() {
        let err = parse(r#"{"code":404,"message":"**symbol** not found: ZZZZ","status":"error"}"#).unwrap_err();
        assert!(matches!(err, PriceProviderError::NotFound));
    }
}
