//! Cached exchange-rate provider.

use std::sync::Arc;

use rust_decimal::Decimal;
use spotrate_common::{CurrencyInput, CurrencyPair};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::config::ExchangeConfig;
use crate::error::FxResult;
use crate::fetcher::{HttpRateFetcher, RateFetcher};
use crate::store::RateStore;
use crate::ttl::{SharedTtlClock, TtlClock};

/// Store plus the TTL epoch it was last flushed at.
#[derive(Debug)]
struct CacheState {
    store: RateStore,
    epoch: u64,
}

/// Serves rates from an in-memory store, fetching on a miss and flushing
/// everything when the shared TTL clock expires.
///
/// Calls on one provider are serialized: the store lock is held across the
/// remote fetch, so a flush can never discard a rate that is about to be
/// written, and two misses for the same pair on one provider fetch once.
pub struct ExchangeProvider {
    fetcher: Arc<dyn RateFetcher>,
    ttl: SharedTtlClock,
    state: Mutex<CacheState>,
}

impl ExchangeProvider {
    /// Create a provider with the given fetcher and shared TTL clock.
    pub fn new(fetcher: Arc<dyn RateFetcher>, ttl: SharedTtlClock) -> Self {
        let epoch = ttl.epoch();
        Self {
            fetcher,
            ttl,
            state: Mutex::new(CacheState {
                store: RateStore::new(),
                epoch,
            }),
        }
    }

    /// Create a provider talking to the configured pricing API.
    ///
    /// The TTL clock is created from `config.ttl_seconds`; use [`new`](Self::new)
    /// to share one clock between several providers.
    pub fn from_config(config: &ExchangeConfig) -> FxResult<Self> {
        let fetcher = HttpRateFetcher::from_config(config)?;
        Ok(Self::new(
            Arc::new(fetcher),
            TtlClock::shared(config.ttl_seconds),
        ))
    }

    /// The TTL clock this provider expires on.
    pub fn ttl(&self) -> &SharedTtlClock {
        &self.ttl
    }

    /// Name of the underlying fetcher.
    pub fn fetcher_name(&self) -> &str {
        self.fetcher.name()
    }

    /// Get the rate for `from -> to`, from cache when possible.
    pub async fn get_rate<'a, 'b>(
        &self,
        from: impl Into<CurrencyInput<'a>>,
        to: impl Into<CurrencyInput<'b>>,
    ) -> FxResult<Decimal> {
        let pair = CurrencyPair::parse(from, to)?;
        self.get_pair_rate(&pair).await
    }

    /// Get the rate for an already normalized pair.
    #[instrument(skip(self, pair), fields(pair = %pair))]
    pub async fn get_pair_rate(&self, pair: &CurrencyPair) -> FxResult<Decimal> {
        let mut state = self.state.lock().await;
        self.expire_locked(&mut state);

        if let Some(rate) = state.store.get(pair) {
            debug!(rate = %rate, "Cache hit");
            return Ok(rate);
        }

        debug!(fetcher = self.fetcher.name(), "Cache miss, fetching");
        let rate = self.fetcher.fetch_rate(pair).await?;

        Ok(state.store.put(pair, rate))
    }

    /// Look up a cached rate without fetching or expiring anything.
    pub async fn cached_rate<'a, 'b>(
        &self,
        from: impl Into<CurrencyInput<'a>>,
        to: impl Into<CurrencyInput<'b>>,
    ) -> FxResult<Option<Decimal>> {
        let pair = CurrencyPair::parse(from, to)?;
        Ok(self.state.lock().await.store.get(&pair))
    }

    /// Remove one cached rate, returning it if it was present.
    pub async fn flush_rate<'a, 'b>(
        &self,
        from: impl Into<CurrencyInput<'a>>,
        to: impl Into<CurrencyInput<'b>>,
    ) -> FxResult<Option<Decimal>> {
        let pair = CurrencyPair::parse(from, to)?;
        Ok(self.flush_pair(&pair).await)
    }

    /// Remove one cached rate for an already normalized pair.
    pub async fn flush_pair(&self, pair: &CurrencyPair) -> Option<Decimal> {
        let removed = self.state.lock().await.store.remove(pair);
        debug!(pair = %pair, removed = removed.is_some(), "Flushed rate");
        removed
    }

    /// Remove every cached rate regardless of TTL. Returns the number evicted.
    pub async fn flush_rates(&self) -> usize {
        let evicted = self.state.lock().await.store.clear();
        debug!(evicted, "Flushed all rates");
        evicted
    }

    /// Flush the cache if the TTL has run out. Returns whether it flushed.
    pub async fn expire_rates(&self) -> bool {
        let mut state = self.state.lock().await;
        self.expire_locked(&mut state)
    }

    /// Number of cached rates.
    pub async fn cached_len(&self) -> usize {
        self.state.lock().await.store.len()
    }

    /// Cached keys in sorted order, e.g. `USD_TO_EUR`.
    pub async fn cached_keys(&self) -> Vec<String> {
        self.state.lock().await.store.keys()
    }

    fn expire_locked(&self, state: &mut CacheState) -> bool {
        let epoch = self.ttl.poll_epoch();
        if epoch == state.epoch {
            return false;
        }

        let evicted = state.store.clear();
        state.epoch = epoch;
        info!(evicted, epoch, "Expired cached rates");
        true
    }
}

impl std::fmt::Debug for ExchangeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeProvider")
            .field("fetcher", &self.fetcher.name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
