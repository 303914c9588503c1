//! In-memory rate storage keyed by currency pair.

use rust_decimal::Decimal;
use spotrate_common::CurrencyPair;
use std::collections::HashMap;
use tracing::trace;

/// Map of `FROM_TO_TO` keys to rates.
///
/// Lookups are exact: callers normalize currencies before building the
/// pair. The store does no locking of its own; the owning provider guards it.
#[derive(Debug, Default, Clone)]
pub struct RateStore {
    rates: HashMap<String, Decimal>,
}

impl RateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a stored rate.
    pub fn get(&self, pair: &CurrencyPair) -> Option<Decimal> {
        self.rates.get(&pair.key()).copied()
    }

    /// Insert or overwrite a rate, returning the stored value.
    pub fn put(&mut self, pair: &CurrencyPair, rate: Decimal) -> Decimal {
        trace!(pair = %pair, rate = %rate, "Storing rate");
        self.rates.insert(pair.key(), rate);
        rate
    }

    /// Remove a single rate, returning it if it was present.
    pub fn remove(&mut self, pair: &CurrencyPair) -> Option<Decimal> {
        self.rates.remove(&pair.key())
    }

    /// Remove every rate. Returns the number of evicted entries.
    pub fn clear(&mut self) -> usize {
        let evicted = self.rates.len();
        self.rates.clear();
        evicted
    }

    /// Whether a rate is stored for the pair.
    pub fn contains(&self, pair: &CurrencyPair) -> bool {
        self.rates.contains_key(&pair.key())
    }

    /// Get the number of stored rates.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.rates.keys().cloned().collect();
        keys.sort();
        keys
    }
}
