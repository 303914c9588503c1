//! Exchange provider configuration.

use std::time::Duration;

use crate::error::{FxError, FxResult};

/// Default endpoint of the remote pricing API.
pub const DEFAULT_BASE_URL: &str = "https://api.coinbase.com/v2";

/// Configuration for an [`ExchangeProvider`](crate::ExchangeProvider).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Base URL of the pricing API; `exchange-rates` is appended to it.
    pub base_url: String,
    /// Seconds between cache expirations. `None` keeps rates forever.
    pub ttl_seconds: Option<u64>,
    /// HTTP request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ttl_seconds: None,
            request_timeout: None,
            user_agent: format!("spotrate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ExchangeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables keep their defaults. A value that does not parse is
    /// an error rather than silently falling back.
    pub fn from_env() -> FxResult<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> FxResult<Self> {
        let mut config = Self::default();

        if let Some(url) = var("SPOTRATE_BASE_URL") {
            config.base_url = url;
        }

        if let Some(ttl) = var("SPOTRATE_TTL_SECONDS") {
            config.ttl_seconds = Some(parse_seconds("SPOTRATE_TTL_SECONDS", &ttl)?);
        }

        if let Some(timeout) = var("SPOTRATE_TIMEOUT_SECS") {
            let secs = parse_seconds("SPOTRATE_TIMEOUT_SECS", &timeout)?;
            config.request_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Set the TTL.
    pub fn with_ttl(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = Some(ttl_seconds);
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> FxResult<()> {
        if self.base_url.is_empty() {
            return Err(FxError::Config("Base URL cannot be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(FxError::Config(format!(
                "Base URL must be http(s): {}",
                self.base_url
            )));
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(FxError::Config("Request timeout cannot be zero".to_string()));
        }

        Ok(())
    }
}

fn parse_seconds(name: &str, value: &str) -> FxResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| FxError::Config(format!("{name} must be whole seconds, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExchangeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.ttl_seconds, None);
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_builders() {
        let config = ExchangeConfig::default()
            .with_ttl(86400)
            .with_base_url("http://127.0.0.1:9000")
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(config.ttl_seconds, Some(86400));
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert!(config.validate().is_ok());
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    #[test]
    fn test_config_from_vars() {
        let config = ExchangeConfig::from_vars(vars(&[
            ("SPOTRATE_BASE_URL", "http://127.0.0.1:9000"),
            ("SPOTRATE_TTL_SECONDS", "3600"),
            ("SPOTRATE_TIMEOUT_SECS", " 10 "),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.ttl_seconds, Some(3600));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(10)));

        let config = ExchangeConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config, ExchangeConfig::default());
    }

    #[test]
    fn test_unparsable_env_values_are_rejected() {
        let result = ExchangeConfig::from_vars(vars(&[("SPOTRATE_TTL_SECONDS", "3600s")]));
        assert!(matches!(result, Err(FxError::Config(msg)) if msg.contains("SPOTRATE_TTL_SECONDS")));

        let result = ExchangeConfig::from_vars(vars(&[("SPOTRATE_TIMEOUT_SECS", "ten")]));
        assert!(matches!(result, Err(FxError::Config(msg)) if msg.contains("SPOTRATE_TIMEOUT_SECS")));

        let result = ExchangeConfig::from_vars(vars(&[("SPOTRATE_TTL_SECONDS", "-5")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config() {
        let config = ExchangeConfig::default().with_base_url("");
        assert!(matches!(config.validate(), Err(FxError::Config(_))));

        let config = ExchangeConfig::default().with_base_url("ftp://rates");
        assert!(config.validate().is_err());

        let config = ExchangeConfig::default().with_request_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
