//! Spotrate CLI
//!
//! Looks up spot exchange rates through a cached provider.

use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spotrate_common::CurrencyPair;
use spotrate_fx::{ExchangeConfig, ExchangeProvider, FxError};

/// Spotrate CLI
#[derive(Parser, Debug)]
#[command(name = "spotrate")]
#[command(about = "Look up spot exchange rates")]
struct Args {
    /// Currency codes as FROM TO pairs, e.g. `USD EUR BTC USD`
    #[arg(required = true, num_args = 2..)]
    currencies: Vec<String>,

    /// Seconds before cached rates expire
    #[arg(long)]
    ttl: Option<u64>,

    /// Base URL of the pricing API
    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Query every pair this many times (later rounds come from cache)
    #[arg(long, default_value = "1")]
    repeat: usize,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<ExchangeConfig> {
        let mut config = ExchangeConfig::from_env().context("Invalid environment configuration")?;

        if let Some(ttl) = self.ttl {
            config = config.with_ttl(ttl);
        }

        if let Some(url) = &self.base_url {
            config = config.with_base_url(url.clone());
        }

        if let Some(secs) = self.timeout {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    fn pairs(&self) -> anyhow::Result<Vec<CurrencyPair>> {
        if self.currencies.len() % 2 != 0 {
            bail!("Currencies must come in FROM TO pairs");
        }

        self.currencies
            .chunks(2)
            .map(|chunk| {
                CurrencyPair::parse(&chunk[0], &chunk[1])
                    .with_context(|| format!("Invalid pair {} {}", chunk[0], chunk[1]))
            })
            .collect()
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let pairs = args.pairs()?;
    let config = args.config()?;
    config.validate().context("Configuration error")?;

    info!(
        base_url = %config.base_url,
        ttl_seconds = ?config.ttl_seconds,
        pairs = pairs.len(),
        "Starting spotrate"
    );

    let provider = ExchangeProvider::from_config(&config)?;

    for round in 1..=args.repeat.max(1) {
        debug!(round, "Querying rates");

        for pair in &pairs {
            match provider.get_pair_rate(pair).await {
                Ok(rate) => println!("{pair} {rate}"),
                Err(e @ FxError::UnknownRate(_)) => bail!("{e} (the service cannot price this pair)"),
                Err(e) => return Err(e).context("Rate lookup failed, try again later"),
            }
        }
    }

    info!(cached = provider.cached_len().await, "Done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_from_args() {
        let args = Args::try_parse_from(["spotrate", "usd", "eur", "BTC", "USD"]).unwrap();
        let pairs = args.pairs().unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].key(), "USD_TO_EUR");
        assert_eq!(pairs[1].key(), "BTC_TO_USD");
    }

    #[test]
    fn test_odd_currency_count_is_rejected() {
        let args = Args::try_parse_from(["spotrate", "USD", "EUR", "BTC"]).unwrap();
        assert!(args.pairs().is_err());
    }

    #[test]
    fn test_invalid_code_is_rejected() {
        let args = Args::try_parse_from(["spotrate", "USD", "€"]).unwrap();
        assert!(args.pairs().is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "spotrate",
            "USD",
            "EUR",
            "--ttl",
            "60",
            "--base-url",
            "http://127.0.0.1:8080",
            "--timeout",
            "3",
        ])
        .unwrap();
        let config = args.config().unwrap();

        assert_eq!(config.ttl_seconds, Some(60));
        assert_eq!(config.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(3)));
    }
}
