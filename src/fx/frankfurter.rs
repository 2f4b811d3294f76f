//! Client for the Frankfurter historical-rate API (ECB reference rates).
//!
//! No authentication. `GET /{YYYY-MM-DD}?from=TRY&to=EUR` returns
//! `{"amount":1.0,"base":"TRY","date":"2025-01-15","rates":{"EUR":0.028}}`;
//! `/latest` serves today's rate. On days without a reference rate the
//! source answers with the previous business day, reported in `date`.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::clock::{Clock, SystemClock};
use super::error::RateError;
use super::gateway::DEFAULT_FETCH_TIMEOUT;
use super::provider::{CurrencyPair, Quote, RateProvider};

pub const FRANKFURTER_URL: &str = "https://api.frankfurter.app";

#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    base: String,
    date: NaiveDate,
    rates: HashMap<String, serde_json::Number>,
}

/// [`RateProvider`] over HTTP.
pub struct FrankfurterProvider {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl FrankfurterProvider {
    /// Provider for the public endpoint with the default timeout.
    ///
    /// # Errors
    ///
    /// [`RateError::Network`] when the HTTP client cannot be built.
    pub fn new() -> Result<Self, RateError> {
        Self::with_base_url(FRANKFURTER_URL, DEFAULT_FETCH_TIMEOUT)
    }

    /// # Errors
    ///
    /// [`RateError::Network`] when the HTTP client cannot be built.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RateError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// `/latest` for today, `/{date}` otherwise.
    fn endpoint(&self, date: NaiveDate) -> String {
        if date == self.clock.today() {
            format!("{}/latest", self.base_url)
        } else {
            format!("{}/{}", self.base_url, date.format("%Y-%m-%d"))
        }
    }
}

impl RateProvider for FrankfurterProvider {
    async fn fetch(&self, pair: &CurrencyPair, date: NaiveDate) -> Result<Quote, RateError> {
        let url = self.endpoint(date);
        debug!("requesting {pair} rate from {url}");

        let resp = self
            .client
            .get(&url)
            .query(&[("from", pair.from()), ("to", pair.to())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RateError::Timeout(self.timeout)
                } else {
                    RateError::Network(e.to_string())
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| RateError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(RateError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_response(&body, pair)
    }
}

fn parse_response(body: &str, pair: &CurrencyPair) -> Result<Quote, RateError> {
    let resp: FrankfurterResponse =
        serde_json::from_str(body).map_err(|e| RateError::Parse(e.to_string()))?;

    if !resp.base.eq_ignore_ascii_case(pair.from()) {
        return Err(RateError::Parse(format!(
            "asked for base {}, got {}",
            pair.from(),
            resp.base
        )));
    }
    let number = resp
        .rates
        .get(pair.to())
        .ok_or_else(|| RateError::Parse(format!("no {} rate in response", pair.to())))?;

    // go through the textual form so 0.028 stays exactly 0.028
    let text = number.to_string();
    let rate = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| RateError::Parse(format!("rate '{text}': {e}")))?;
    if rate <= Decimal::ZERO {
        return Err(RateError::Parse(format!("non-positive rate {rate}")));
    }

    Ok(Quote {
        rate,
        date: resp.date,
    })
}
