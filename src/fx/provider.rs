use std::fmt;
use std::future::Future;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::RateError;
use crate::core::{BASE_CURRENCY, is_known_currency_code};

/// An ordered currency pair: 1 `from` = rate × `to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    from: String,
    to: String,
}

impl CurrencyPair {
    /// # Errors
    ///
    /// [`RateError::UnsupportedCurrency`] for codes outside the ISO 4217 list.
    pub fn new(from: &str, to: &str) -> Result<Self, RateError> {
        let from = normalize_code(from)?;
        let to = normalize_code(to)?;
        Ok(Self { from, to })
    }

    /// `from` → EUR.
    pub fn to_base(from: &str) -> Result<Self, RateError> {
        Self::new(from, BASE_CURRENCY)
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }

    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.from, self.to)
    }
}

fn normalize_code(code: &str) -> Result<String, RateError> {
    let code = code.trim().to_ascii_uppercase();
    if is_known_currency_code(&code) {
        Ok(code)
    } else {
        Err(RateError::UnsupportedCurrency(code))
    }
}

/// A rate as reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub rate: Decimal,
    /// Date the source says the rate is for. May precede the requested
    /// date (weekends, holidays).
    pub date: NaiveDate,
}

/// A historical exchange-rate source.
pub trait RateProvider: Send + Sync {
    /// Rate for `pair` on `date`.
    ///
    /// # Errors
    ///
    /// Transport, status and parse failures. The gateway treats every
    /// error as a failed live fetch.
    fn fetch(
        &self,
        pair: &CurrencyPair,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Quote, RateError>> + Send;
}
