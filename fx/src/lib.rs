//! Spotrate FX Provider
//!
//! Spot exchange rates fetched from a remote pricing API, cached in memory
//! and expired on a TTL schedule shared by every provider of one kind.
//!
//! # Features
//!
//! - One remote lookup per cache miss; hits never touch the network
//! - Shared TTL clock so several providers expire together
//! - Point and bulk eviction
//! - Unknown pairs reported apart from transient fetch failures
//!
//! # Example
//!
//! ```rust,ignore
//! use spotrate_fx::{ExchangeConfig, ExchangeProvider};
//!
//! let provider = ExchangeProvider::from_config(&ExchangeConfig::default().with_ttl(3600))?;
//!
//! let rate = provider.get_rate("USD", "EUR").await?;
//! provider.flush_rate("USD", "EUR").await?;
//! ```

pub mod config;
pub mod error;
pub mod fetcher;
pub mod provider;
pub mod source;
pub mod store;
pub mod ttl;

pub use config::ExchangeConfig;
pub use error::{FxError, FxResult};
pub use fetcher::{HttpRateFetcher, Quotes, RateFetcher};
pub use provider::ExchangeProvider;
pub use source::{FallbackRateSource, RateSource};
pub use store::RateStore;
pub use ttl::{SharedTtlClock, TtlClock};

#[cfg(any(test, feature = "test-utils"))]
pub use fetcher::{MockFailure, MockRateFetcher};
