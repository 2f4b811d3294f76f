//! Foreign-currency receipts: exchange rates, caching, and EUR normalization.
//!
//! [`ExchangeRateGateway`] resolves a historical rate through a shared
//! [`RateCache`] and a [`RateProvider`]; [`CurrencyNormalizer`] uses it to
//! rewrite a record's amounts into EUR while keeping the printed amounts
//! in [`ConversionMetadata`](crate::core::ConversionMetadata).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use kassabon::fx::*;
//!
//! let cache = Arc::new(RateCache::open("rates.json")?);
//! let gateway = ExchangeRateGateway::new(FrankfurterProvider::new()?, cache);
//!
//! let lookup = gateway.rate("TRY", "EUR", date).await?;
//! println!("{} ({})", lookup.rate, lookup.source);
//! ```

mod cache;
mod clock;
mod error;
#[cfg(feature = "frankfurter")]
mod frankfurter;
mod gateway;
mod languages;
mod normalizer;
mod provider;

pub use cache::{RateCache, RateCacheEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::RateError;
#[cfg(feature = "frankfurter")]
pub use frankfurter::{FRANKFURTER_URL, FrankfurterProvider};
pub use gateway::{
    DEFAULT_CACHE_VALIDITY_DAYS, DEFAULT_FALLBACK_WINDOW_DAYS, DEFAULT_FETCH_TIMEOUT,
    ExchangeRateGateway, GatewayOptions, RateLookup,
};
pub use languages::CurrencyMap;
pub use normalizer::{CurrencyNormalizer, Normalization};
pub use provider::{CurrencyPair, Quote, RateProvider};
