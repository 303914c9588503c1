//! FX provider error types.

use spotrate_common::{CommonError, CurrencyPair};
use thiserror::Error;

/// Errors that can occur while obtaining a rate.
#[derive(Debug, Error)]
pub enum FxError {
    /// The remote service cannot price this pair. Retrying will not help.
    #[error("Unknown rate for {0}")]
    UnknownRate(CurrencyPair),

    /// Anything else that went wrong talking to the remote service.
    #[error("Failed to fetch exchange rates: {0}")]
    FetchFailed(String),

    /// A currency identifier could not be normalized.
    #[error(transparent)]
    InvalidCurrency(#[from] CommonError),

    /// Expiration was refreshed while no TTL is configured.
    #[error("Rate TTL is not configured")]
    TtlNotConfigured,

    /// Provider configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl FxError {
    /// Whether the failure will repeat for the same input.
    ///
    /// Callers typically fall back to another rate source on a permanent
    /// error and retry later on a transient one.
    pub fn is_permanent(&self) -> bool {
        !matches!(self, FxError::FetchFailed(_))
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
