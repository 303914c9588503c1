//! Error types shared across spotrate crates.

use thiserror::Error;

/// Errors raised while handling currency identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// The input could not be resolved to a currency code.
    #[error("Invalid currency: {0:?}")]
    InvalidCurrency(String),
}

/// Result type for common operations.
pub type CommonResult<T> = Result<T, CommonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CommonError::InvalidCurrency("U$".to_string());
        assert_eq!(err.to_string(), "Invalid currency: \"U$\"");
    }
}
