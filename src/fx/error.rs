use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;

/// Failure to resolve an exchange rate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum RateError {
    /// Connection or transport failure.
    #[error("rate source unreachable: {0}")]
    Network(String),
    /// The rate source answered with a non-success status.
    #[error("rate source returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    /// The response could not be understood.
    #[error("unexpected rate response: {0}")]
    Parse(String),
    /// The live fetch did not finish in time.
    #[error("rate request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unsupported currency '{0}'")]
    UnsupportedCurrency(String),
    /// No live rate and no cached rate inside the fallback window.
    #[error("no exchange rate for {pair} on {date}: {reason}")]
    Unavailable {
        pair: String,
        date: NaiveDate,
        reason: String,
    },
    /// Reading or writing the cache file failed.
    #[error("rate cache error: {0}")]
    Cache(String),
}
