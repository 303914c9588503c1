//! Remote rate lookup.
//!
//! A fetcher asks the pricing service for every rate quoted against one
//! base currency and picks the requested target out of the answer. Only
//! "the service does not know this currency" is told apart from other
//! failures; everything else collapses into [`FxError::FetchFailed`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use spotrate_common::{Currency, CurrencyPair};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, instrument, warn};

use crate::config::ExchangeConfig;
use crate::error::{FxError, FxResult};

/// Target currency code to rate, as the service renders it.
pub type Quotes = HashMap<String, String>;

/// Prefix of the error message the service returns for unsupported currencies.
const INVALID_CURRENCY_MARKER: &str = "Invalid currency";

/// Trait for remote rate lookups.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Get the fetcher name.
    fn name(&self) -> &str;

    /// Fetch all rates quoted against `base`.
    async fn fetch_quotes(&self, base: &Currency) -> FxResult<Quotes>;

    /// Fetch the rate for one normalized pair.
    async fn fetch_rate(&self, pair: &CurrencyPair) -> FxResult<Decimal> {
        let quotes = self.fetch_quotes(&pair.from).await.map_err(|e| match e {
            FxError::UnknownRate(_) => FxError::UnknownRate(pair.clone()),
            other => other,
        })?;

        parse_quote(pair, quotes.get(pair.to.code()).map(String::as_str))
    }
}

/// Turn a quoted rate string into a decimal.
///
/// A missing or empty quote means the pair is unknown; a quote that is not
/// a non-negative number is a malformed response.
pub fn parse_quote(pair: &CurrencyPair, quote: Option<&str>) -> FxResult<Decimal> {
    let raw = match quote.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Err(FxError::UnknownRate(pair.clone())),
    };

    let rate = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| FxError::FetchFailed(format!("Unparsable rate {raw:?} for {pair}: {e}")))?;

    if rate.is_sign_negative() {
        return Err(FxError::FetchFailed(format!("Negative rate {raw} for {pair}")));
    }

    Ok(rate)
}

#[derive(Debug, Deserialize)]
struct ExchangeRatesResponse {
    data: ExchangeRatesData,
}

#[derive(Debug, Deserialize)]
struct ExchangeRatesData {
    rates: HashMap<String, serde_json::Value>,
}

impl ExchangeRatesData {
    /// Keep the string quotes. A null or numeric entry only affects its own pair.
    fn into_quotes(self) -> Quotes {
        self.rates
            .into_iter()
            .filter_map(|(code, value)| match value {
                serde_json::Value::String(rate) => Some((code, rate)),
                other => {
                    debug!(code = %code, value = %other, "Skipping non-string quote");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
}

/// Whether a 400 body reports an unsupported currency.
fn is_invalid_currency(body: &str) -> bool {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|resp| resp.errors.into_iter().next())
        .and_then(|err| err.message)
        .is_some_and(|message| message.starts_with(INVALID_CURRENCY_MARKER))
}

fn unknown_base(base: &Currency) -> FxError {
    FxError::UnknownRate(CurrencyPair::new(base.clone(), base.clone()))
}

fn fetch_failed(base: &Currency, reason: impl Into<String>) -> FxError {
    let reason = reason.into();
    warn!(base = %base, reason = %reason, "Exchange rate fetch failed");
    FxError::FetchFailed(reason)
}

/// Fetcher for a Coinbase-style `GET /exchange-rates?currency=XXX` endpoint.
#[derive(Debug, Clone)]
pub struct HttpRateFetcher {
    client: Client,
    endpoint: String,
}

impl HttpRateFetcher {
    /// Create a fetcher against `base_url` with default settings.
    pub fn new(base_url: impl Into<String>) -> FxResult<Self> {
        Self::from_config(&ExchangeConfig::default().with_base_url(base_url))
    }

    /// Create a fetcher from configuration.
    pub fn from_config(config: &ExchangeConfig) -> FxResult<Self> {
        config.validate()?;

        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FxError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(client, &config.base_url))
    }

    /// Create a fetcher around an existing HTTP client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/exchange-rates", base_url.trim_end_matches('/')),
        }
    }

    /// Full URL requests are sent to, without the query string.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RateFetcher for HttpRateFetcher {
    fn name(&self) -> &str {
        "COINBASE"
    }

    #[instrument(skip(self, base), fields(base = %base))]
    async fn fetch_quotes(&self, base: &Currency) -> FxResult<Quotes> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("currency", base.code())])
            .send()
            .await
            .map_err(|e| fetch_failed(base, e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::OK => {
                let body: ExchangeRatesResponse = response
                    .json()
                    .await
                    .map_err(|e| fetch_failed(base, format!("Malformed response: {e}")))?;

                let quotes = body.data.into_quotes();
                debug!(quotes = quotes.len(), "Fetched exchange rates");
                Ok(quotes)
            }
            StatusCode::NOT_FOUND => {
                debug!("Currency not found");
                Err(unknown_base(base))
            }
            StatusCode::BAD_REQUEST => {
                let is_json = response
                    .headers()
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .is_some_and(|v| v.starts_with("application/json"));
                let body = response
                    .text()
                    .await
                    .map_err(|e| fetch_failed(base, e.to_string()))?;

                if is_json && is_invalid_currency(&body) {
                    debug!("Currency rejected as invalid");
                    return Err(unknown_base(base));
                }

                Err(fetch_failed(base, format!("HTTP {status}: {body}")))
            }
            _ => Err(fetch_failed(base, format!("HTTP {status}"))),
        }
    }
}

/// Scripted failure for [`MockRateFetcher`].
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    /// Behave as if the service rejected the base currency.
    UnknownCurrency,
    /// Behave as if the request failed.
    FetchFailed(String),
}

/// In-memory fetcher for testing. Counts every `fetch_quotes` call.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug)]
pub struct MockRateFetcher {
    name: String,
    quotes: dashmap::DashMap<Currency, Quotes>,
    failures: dashmap::DashMap<Currency, MockFailure>,
    calls: dashmap::DashMap<Currency, usize>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateFetcher {
    /// Create a new mock fetcher with no quotes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quotes: dashmap::DashMap::new(),
            failures: dashmap::DashMap::new(),
            calls: dashmap::DashMap::new(),
        }
    }

    /// Set the quoted rate string for `from -> to`.
    pub fn set_quote(&self, from: &str, to: &str, rate: &str) {
        let from = Currency::new(from).expect("valid test currency");
        self.quotes
            .entry(from)
            .or_default()
            .insert(to.to_string(), rate.to_string());
    }

    /// Make every fetch for `base` fail.
    pub fn fail(&self, base: &str, failure: MockFailure) {
        let base = Currency::new(base).expect("valid test currency");
        self.failures.insert(base, failure);
    }

    /// Total number of remote lookups.
    pub fn calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    /// Number of remote lookups for one base currency.
    pub fn calls_for(&self, base: &str) -> usize {
        Currency::new(base)
            .ok()
            .and_then(|base| self.calls.get(&base).map(|n| *n))
            .unwrap_or(0)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateFetcher for MockRateFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_quotes(&self, base: &Currency) -> FxResult<Quotes> {
        *self.calls.entry(base.clone()).or_insert(0) += 1;

        if let Some(failure) = self.failures.get(base) {
            return Err(match failure.value() {
                MockFailure::UnknownCurrency => unknown_base(base),
                MockFailure::FetchFailed(reason) => FxError::FetchFailed(reason.clone()),
            });
        }

        self.quotes
            .get(base)
            .map(|q| q.clone())
            .ok_or_else(|| unknown_base(base))
    }
}
