//! The rate-source contract a conversion library consumes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use spotrate_common::CurrencyPair;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};
use crate::provider::ExchangeProvider;

/// Interchangeable source of spot rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Get the rate for a normalized pair.
    async fn get_rate(&self, pair: &CurrencyPair) -> FxResult<Decimal>;

    /// Forget one cached rate, if the source caches.
    async fn flush_rate(&self, pair: &CurrencyPair) -> Option<Decimal>;

    /// Forget every cached rate. Returns the number evicted.
    async fn flush_rates(&self) -> usize;
}

#[async_trait]
impl RateSource for ExchangeProvider {
    fn name(&self) -> &str {
        self.fetcher_name()
    }

    async fn get_rate(&self, pair: &CurrencyPair) -> FxResult<Decimal> {
        self.get_pair_rate(pair).await
    }

    async fn flush_rate(&self, pair: &CurrencyPair) -> Option<Decimal> {
        self.flush_pair(pair).await
    }

    async fn flush_rates(&self) -> usize {
        ExchangeProvider::flush_rates(self).await
    }
}

/// Tries sources in order, moving on when one cannot price the pair.
///
/// Only [`FxError::UnknownRate`] falls through to the next source. A
/// transient failure is returned as-is so the caller can retry.
pub struct FallbackRateSource {
    sources: Vec<Arc<dyn RateSource>>,
}

impl FallbackRateSource {
    /// Create a fallback chain. Earlier sources are preferred.
    pub fn new(sources: Vec<Arc<dyn RateSource>>) -> Self {
        Self { sources }
    }

    /// Number of sources in the chain.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the chain has no sources.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[async_trait]
impl RateSource for FallbackRateSource {
    fn name(&self) -> &str {
        "FALLBACK"
    }

    async fn get_rate(&self, pair: &CurrencyPair) -> FxResult<Decimal> {
        for source in &self.sources {
            match source.get_rate(pair).await {
                Ok(rate) => {
                    debug!(source = source.name(), pair = %pair, rate = %rate, "Got rate from source");
                    return Ok(rate);
                }
                Err(FxError::UnknownRate(_)) => {
                    debug!(source = source.name(), pair = %pair, "Source cannot price pair");
                }
                Err(e) => {
                    warn!(source = source.name(), pair = %pair, error = %e, "Source failed");
                    return Err(e);
                }
            }
        }

        Err(FxError::UnknownRate(pair.clone()))
    }

    async fn flush_rate(&self, pair: &CurrencyPair) -> Option<Decimal> {
        let mut first = None;
        for source in &self.sources {
            let removed = source.flush_rate(pair).await;
            first = first.or(removed);
        }
        first
    }

    async fn flush_rates(&self) -> usize {
        let mut evicted = 0;
        for source in &self.sources {
            evicted += source.flush_rates().await;
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{MockFailure, MockRateFetcher};
    use crate::ttl::TtlClock;
    use rust_decimal_macros::dec;

    fn provider(fetcher: &Arc<MockRateFetcher>) -> Arc<dyn RateSource> {
        Arc::new(ExchangeProvider::new(fetcher.clone(), TtlClock::shared(None)))
    }

    fn pair(from: &str, to: &str) -> CurrencyPair {
        CurrencyPair::parse(from, to).unwrap()
    }

    #[tokio::test]
    async fn test_provider_as_source() {
        let fetcher = Arc::new(MockRateFetcher::new("primary"));
        fetcher.set_quote("USD", "EUR", "0.776337241");
        let source = provider(&fetcher);

        assert_eq!(source.name(), "primary");
        assert_eq!(source.get_rate(&pair("USD", "EUR")).await.unwrap(), dec!(0.776337241));
        assert_eq!(source.flush_rate(&pair("USD", "EUR")).await, Some(dec!(0.776337241)));
        assert_eq!(source.flush_rates().await, 0);
    }

    #[tokio::test]
    async fn test_fallback_on_unknown_rate() {
        let primary = Arc::new(MockRateFetcher::new("primary"));
        primary.fail("XAU", MockFailure::UnknownCurrency);
        let secondary = Arc::new(MockRateFetcher::new("secondary"));
        secondary.set_quote("XAU", "USD", "2350.10");

        let chain = FallbackRateSource::new(vec![provider(&primary), provider(&secondary)]);

        assert_eq!(chain.get_rate(&pair("XAU", "USD")).await.unwrap(), dec!(2350.10));
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
        assert_eq!(chain.flush_rates().await, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_fall_through() {
        let primary = Arc::new(MockRateFetcher::new("primary"));
        primary.fail("USD", MockFailure::FetchFailed("HTTP 503".into()));
        let secondary = Arc::new(MockRateFetcher::new("secondary"));
        secondary.set_quote("USD", "EUR", "0.92");

        let chain = FallbackRateSource::new(vec![provider(&primary), provider(&secondary)]);

        let result = chain.get_rate(&pair("USD", "EUR")).await;
        assert!(matches!(result, Err(FxError::FetchFailed(_))));
        assert_eq!(secondary.calls(), 0);
    }

    #[test]
    fn test_exhausted_chain_is_unknown_rate() {
        let chain = FallbackRateSource::new(Vec::new());
        assert!(chain.is_empty());

        let result = tokio_test::block_on(chain.get_rate(&pair("USD", "EUR")));
        assert!(matches!(result, Err(FxError::UnknownRate(_))));
    }
}
