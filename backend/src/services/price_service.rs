use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::external::price_provider::{PriceProvider, PriceProviderError};
use crate::models::{PriceQuote, PriceValue};
use crate::services::rate_limiter::RateLimiter;
use crate::utils::normalize_ticker;

/// Request priorities, 1 is most urgent.
pub mod priority {
    pub const INTERACTIVE: u8 = 1;
    pub const JOURNAL: u8 = 3;
    pub const WATCHLIST: u8 = 4;
    pub const REPORTING: u8 = 5;
    pub const ORDER_WATCHER: u8 = 7;
    pub const EOD_CAPTURE: u8 = 9;
}

type InFlight = Shared<BoxFuture<'static, PriceQuote>>;

#[derive(Clone, Copy)]
struct CacheEntry {
    quote: PriceQuote,
    fetched_at: Instant,
}

/// Live quotes behind a TTL cache and the rate limiter.
///
/// Lookups never fail: provider problems come back as `PriceValue` sentinels
/// and are cached like real prices so a broken ticker is not retried until
/// its entry expires.
pub struct PriceService {
    provider: Option<Arc<dyn PriceProvider>>,
    limiter: RateLimiter,
    cache: DashMap<String, CacheEntry>,
    in_flight: DashMap<String, InFlight>,
    ttl: Duration,
}

impl PriceService {
    pub fn new(provider: Option<Arc<dyn PriceProvider>>, limiter: RateLimiter, ttl: Duration) -> Self {
        Self {
            provider,
            limiter,
            cache: DashMap::new(),
            in_flight: DashMap::new(),
            ttl,
        }
    }

    /// Name of the configured quote provider, if any.
    pub fn provider_name(&self) -> Option<&'static str> {
        self.provider.as_ref().map(|p| p.name())
    }

    /// Prices for every distinct ticker in `tickers`, keyed by normalized ticker.
    pub async fn get_prices(self: &Arc<Self>, tickers: &[String], priority: u8) -> HashMap<String, PriceQuote> {
        let mut wanted: Vec<String> = tickers
            .iter()
            .map(|t| normalize_ticker(t))
            .filter(|t| !t.is_empty())
            .collect();
        wanted.sort();
        wanted.dedup();

        let mut result = HashMap::with_capacity(wanted.len());
        let mut pending = Vec::new();

        for ticker in wanted {
            match self.cached(&ticker) {
                Some(quote) => {
                    result.insert(ticker, quote);
                }
                None => {
                    let fut = self.fetch_shared(ticker.clone(), priority);
                    pending.push(async move { (ticker, fut.await) });
                }
            }
        }

        if !pending.is_empty() {
            debug!("Fetching {} uncached tickers at priority {}", pending.len(), priority);
        }
        result.extend(join_all(pending).await);
        result
    }

    pub async fn get_price(self: &Arc<Self>, ticker: &str, priority: u8) -> PriceValue {
        let ticker = normalize_ticker(ticker);
        match self.cached(&ticker) {
            Some(quote) => quote.price,
            None => self.fetch_shared(ticker, priority).await.price,
        }
    }

    /// A fresh cache entry, if any.
    pub fn cached(&self, ticker: &str) -> Option<PriceQuote> {
        let entry = self.cache.get(ticker)?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.quote)
        } else {
            None
        }
    }

    /// Joins an in-flight request for `ticker` or starts one.
    ///
    /// The fetch runs on its own task, so callers that give up waiting do not
    /// strand the limiter slot or the `in_flight` entry.
    fn fetch_shared(self: &Arc<Self>, ticker: String, priority: u8) -> InFlight {
        match self.in_flight.entry(ticker.clone()) {
            Entry::Occupied(existing) => existing.get().clone(),
            Entry::Vacant(slot) => {
                let this = Arc::clone(self);
                let handle = tokio::spawn(Arc::clone(self).fetch_uncached(ticker.clone(), priority));
                let fut = async move {
                    match handle.await {
                        Ok(quote) => quote,
                        Err(e) => {
                            warn!("Price fetch task for {} failed: {}", ticker, e);
                            this.in_flight.remove(&ticker);
                            PriceQuote {
                                price: PriceValue::Error,
                                timestamp: Utc::now(),
                            }
                        }
                    }
                }
                .boxed()
                .shared();
                slot.insert(fut.clone());
                fut
            }
        }
    }

    async fn fetch_uncached(self: Arc<Self>, ticker: String, priority: u8) -> PriceQuote {
        // Another request may have filled the cache while this one was queued
        let quote = match self.cached(&ticker) {
            Some(quote) => quote,
            None => PriceQuote {
                price: self.query_provider(&ticker, priority).await,
                timestamp: Utc::now(),
            },
        };

        self.cache.insert(
            ticker.clone(),
            CacheEntry {
                quote,
                fetched_at: Instant::now(),
            },
        );
        self.in_flight.remove(&ticker);
        quote
    }

    async fn query_provider(&self, ticker: &str, priority: u8) -> PriceValue {
        let Some(provider) = &self.provider else {
            return PriceValue::Unavailable;
        };

        let _permit = match self.limiter.acquire(priority).await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("Could not acquire rate limit permit for {}: {}", ticker, e);
                return PriceValue::Error;
            }
        };

        match provider.fetch_quote(ticker).await {
            Ok(price) if price > 0.0 => {
                debug!("✓ {} quote for {}: {}", provider.name(), ticker, price);
                PriceValue::Price(price)
            }
            Ok(price) => {
                info!("⚠️ {} returned non-positive quote {} for {}", provider.name(), price, ticker);
                PriceValue::Invalid
            }
            Err(PriceProviderError::NotFound) => {
                info!("⚠️ {} does not know ticker {}", provider.name(), ticker);
                PriceValue::Invalid
            }
            Err(e) => {
                warn!("✗ {} quote failed for {}: {}", provider.name(), ticker, e);
                PriceValue::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubProvider {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl PriceProvider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_quote(&self, ticker: &str) -> Result<f64, PriceProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            match ticker {
                "ZERO" => Ok(0.0),
                "GONE" => Err(PriceProviderError::NotFound),
                "DOWN" => Err(PriceProviderError::Network("connection refused".into())),
                _ => Ok(101.5),
            }
        }
    }

    fn service(delay_ms: u64, ttl: Duration) -> (Arc<PriceService>, Arc<StubProvider>) {
        let provider = Arc::new(StubProvider {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
        });
        let svc = PriceService::new(Some(provider.clone()), RateLimiter::new(2, 600), ttl);
        (Arc::new(svc), provider)
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let (svc, provider) = service(0, Duration::from_secs(60));
        svc.get_price("aapl", priority::INTERACTIVE).await;
        let price = svc.get_price("AAPL", priority::INTERACTIVE).await;
        assert_eq!(price, PriceValue::Price(101.5));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let (svc, provider) = service(0, Duration::from_millis(30));
        svc.get_price("AAPL", 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        svc.get_price("AAPL", 1).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let (svc, provider) = service(50, Duration::from_secs(60));
        let a = svc.clone();
        let b = svc.clone();
        let (pa, pb) = tokio::join!(a.get_price("MSFT", 1), b.get_price("MSFT", 5));
        assert_eq!(pa, pb);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failures_become_sentinels() {
        let (svc, _) = service(0, Duration::from_secs(60));
        let prices = svc
            .get_prices(&["zero".into(), "GONE".into(), "DOWN".into(), "OK".into()], 5)
            .await;
        assert_eq!(prices["ZERO"].price, PriceValue::Invalid);
        assert_eq!(prices["GONE"].price, PriceValue::Invalid);
        assert_eq!(prices["DOWN"].price, PriceValue::Error);
        assert_eq!(prices["OK"].price, PriceValue::Price(101.5));
    }

    #[tokio::test]
    async fn test_batch_dedupes_tickers() {
        let (svc, provider) = service(0, Duration::from_secs(60));
        let prices = svc
            .get_prices(&["AAPL".into(), " aapl ".into(), "".into()], 1)
            .await;
        assert_eq!(prices.len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abandoned_fetch_does_not_starve_other_tickers() {
        let provider = Arc::new(StubProvider {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(200),
        });
        let svc = Arc::new(PriceService::new(
            Some(provider.clone()),
            RateLimiter::new(1, 600),
            Duration::from_secs(60),
        ));

        let abandoned = tokio::time::timeout(Duration::from_millis(50), svc.get_price("AAA", 1)).await;
        assert!(abandoned.is_err());

        let other = tokio::time::timeout(Duration::from_secs(3), svc.get_price("BBB", 1)).await;
        assert_eq!(other.unwrap(), PriceValue::Price(101.5));

        // The abandoned fetch still finished and filled the cache
        assert!(svc.in_flight.is_empty());
        assert_eq!(svc.cached("AAA").map(|q| q.price), Some(PriceValue::Price(101.5)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_provider_yields_null_price() {
        let svc = Arc::new(PriceService::new(None, RateLimiter::new(2, 60), Duration::from_secs(60)));
        assert_eq!(svc.get_price("AAPL", 1).await, PriceValue::Unavailable);
    }
}
