//! Currency identifiers and ordered currency pairs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CommonError, CommonResult};

/// Shortest accepted currency code.
const MIN_CODE_LEN: usize = 2;

/// Longest accepted currency code (crypto tickers run past ISO's three letters).
const MAX_CODE_LEN: usize = 10;

/// Canonical currency code: uppercase ASCII alphanumerics, e.g. `USD` or `BTC`.
///
/// Always constructed through [`normalize`], so two `Currency` values that
/// compare equal render the same code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Parse and normalize a currency code.
    pub fn new(code: &str) -> CommonResult<Self> {
        let code = code.trim();

        if code.len() < MIN_CODE_LEN || code.len() > MAX_CODE_LEN {
            return Err(CommonError::InvalidCurrency(code.to_string()));
        }

        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CommonError::InvalidCurrency(code.to_string()));
        }

        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn gbp() -> Self {
        Self("GBP".to_string())
    }

    pub fn btc() -> Self {
        Self("BTC".to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = CommonError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// The forms a caller may hand in where a currency is expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencyInput<'a> {
    /// Free-form code such as `"usd"` or `" EUR "`.
    Code(&'a str),
    /// An already canonical currency.
    Currency(Currency),
}

impl<'a> From<&'a str> for CurrencyInput<'a> {
    fn from(code: &'a str) -> Self {
        CurrencyInput::Code(code)
    }
}

impl<'a> From<&'a String> for CurrencyInput<'a> {
    fn from(code: &'a String) -> Self {
        CurrencyInput::Code(code.as_str())
    }
}

impl From<Currency> for CurrencyInput<'_> {
    fn from(currency: Currency) -> Self {
        CurrencyInput::Currency(currency)
    }
}

impl From<&Currency> for CurrencyInput<'_> {
    fn from(currency: &Currency) -> Self {
        CurrencyInput::Currency(currency.clone())
    }
}

/// Resolve any accepted currency form to its canonical code.
pub fn normalize<'a>(input: impl Into<CurrencyInput<'a>>) -> CommonResult<Currency> {
    match input.into() {
        CurrencyInput::Code(code) => Currency::new(code),
        CurrencyInput::Currency(currency) => Ok(currency),
    }
}

/// Ordered currency pair. `USD -> EUR` and `EUR -> USD` are different pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency converted from.
    pub from: Currency,
    /// Currency converted to.
    pub to: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(from: Currency, to: Currency) -> Self {
        Self { from, to }
    }

    /// Normalize both sides and build the pair.
    pub fn parse<'a, 'b>(
        from: impl Into<CurrencyInput<'a>>,
        to: impl Into<CurrencyInput<'b>>,
    ) -> CommonResult<Self> {
        Ok(Self::new(normalize(from)?, normalize(to)?))
    }

    /// Get the inverse pair.
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }

    /// Whether both sides are the same currency.
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// Stable composite key used for storage, e.g. `USD_TO_EUR`.
    pub fn key(&self) -> String {
        format!("{}_TO_{}", self.from, self.to)
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}
