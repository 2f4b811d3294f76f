use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, TimeDelta};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;

use super::cache::{RateCache, RateCacheEntry};
use super::clock::{Clock, SystemClock};
use super::error::RateError;
use super::provider::{CurrencyPair, RateProvider};
use crate::core::RateSource;

/// Default bound on a live fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
/// Cached rates younger than this are served without asking the source.
pub const DEFAULT_CACHE_VALIDITY_DAYS: u64 = 90;
/// How far back a fallback rate may lie when the source is down.
pub const DEFAULT_FALLBACK_WINDOW_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayOptions {
    pub fetch_timeout: Duration,
    pub cache_validity_days: u64,
    pub fallback_window_days: u64,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            cache_validity_days: DEFAULT_CACHE_VALIDITY_DAYS,
            fallback_window_days: DEFAULT_FALLBACK_WINDOW_DAYS,
        }
    }
}

/// A resolved rate and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLookup {
    pub rate: Decimal,
    pub rate_date: NaiveDate,
    pub source: RateSource,
}

/// Rate lookups with a cache in front and a stale-tolerant fallback behind.
///
/// 1. exact `(pair, date)` cache entry fetched within the validity window → `cache`
/// 2. live fetch, bounded by the fetch timeout, written to the cache → `live`
/// 3. on live failure, the newest cached rate dated within the fallback
///    window before the date → `fallback`
/// 4. otherwise [`RateError::Unavailable`]
pub struct ExchangeRateGateway<P> {
    provider: P,
    cache: Arc<RateCache>,
    clock: Arc<dyn Clock>,
    options: GatewayOptions,
}

impl<P: RateProvider> ExchangeRateGateway<P> {
    pub fn new(provider: P, cache: Arc<RateCache>) -> Self {
        Self {
            provider,
            cache,
            clock: Arc::new(SystemClock),
            options: GatewayOptions::default(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_options(mut self, options: GatewayOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Rate to convert one unit of `from` into `to` on `date`.
    ///
    /// # Errors
    ///
    /// [`RateError::UnsupportedCurrency`] for unknown codes and
    /// [`RateError::Unavailable`] when neither the source nor the cache
    /// can supply a rate.
    pub async fn rate(&self, from: &str, to: &str, date: NaiveDate) -> Result<RateLookup, RateError> {
        let pair = CurrencyPair::new(from, to)?;
        if pair.is_identity() {
            return Ok(RateLookup {
                rate: Decimal::ONE,
                rate_date: date,
                source: RateSource::Live,
            });
        }

        let now = self.clock.now();
        if let Some(hit) = self.cache.get(&pair, date) {
            let validity = i64::try_from(self.options.cache_validity_days)
                .ok()
                .and_then(TimeDelta::try_days)
                .unwrap_or(TimeDelta::MAX);
            if now - hit.fetched_at <= validity {
                debug!("cache hit for {pair} on {date}: {}", hit.rate);
                return Ok(RateLookup {
                    rate: hit.rate,
                    rate_date: hit.rate_date,
                    source: RateSource::Cache,
                });
            }
            debug!("cached {pair} rate for {date} is stale (fetched {})", hit.fetched_at);
        }

        let live = match tokio::time::timeout(self.options.fetch_timeout, self.provider.fetch(&pair, date)).await {
            Ok(result) => result,
            Err(_) => Err(RateError::Timeout(self.options.fetch_timeout)),
        };

        match live {
            Ok(quote) => {
                info!("fetched {pair} rate for {date}: {} (rate date {})", quote.rate, quote.date);
                let entry = RateCacheEntry {
                    pair,
                    date,
                    rate: quote.rate,
                    rate_date: quote.date,
                    fetched_at: now,
                };
                if let Err(e) = self.cache.insert(entry) {
                    error!("could not persist rate cache: {e}");
                }
                Ok(RateLookup {
                    rate: quote.rate,
                    rate_date: quote.date,
                    source: RateSource::Live,
                })
            }
            Err(live_err) => {
                match self
                    .cache
                    .latest_in_window(&pair, date, self.options.fallback_window_days)
                {
                    Some(fallback) => {
                        warn!(
                            "live {pair} rate for {date} failed ({live_err}); using cached rate from {}",
                            fallback.date
                        );
                        Ok(RateLookup {
                            rate: fallback.rate,
                            rate_date: fallback.rate_date,
                            source: RateSource::Fallback,
                        })
                    }
                    None => {
                        warn!("no {pair} rate for {date}: {live_err}, nothing cached in fallback window");
                        Err(RateError::Unavailable {
                            pair: pair.to_string(),
                            date,
                            reason: live_err.to_string(),
                        })
                    }
                }
            }
        }
    }
}
