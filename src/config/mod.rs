//! Layered configuration loading using figment.
//!
//! Sources, highest priority first:
//! 1. Environment variables (`KASSABON_*` prefix, `__` between sections)
//! 2. A TOML file (`kassabon.toml` in the working directory, or an explicit path)
//! 3. Built-in defaults
//!
//! `KASSABON_REVIEW__CONFIDENCE_THRESHOLD=0.8` sets
//! `review.confidence_threshold`; `KASSABON_RATES__CACHE_PATH` sets
//! `rates.cache_path`.
//!
//! ```toml
//! [review]
//! confidence_threshold = 0.75
//!
//! [rates]
//! cache_path = "data/exchange_rates.json"
//! timeout_secs = 5
//!
//! [currency.language_defaults]
//! en = "GBP"
//!
//! [tax_rules."Vervoerskosten"]
//! vat_deductible = 100
//! ib_deductible = 100
//! ```

mod error;

pub use error::ConfigError;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::core::{Category, is_known_currency_code};
use crate::fx::{
    CurrencyMap, DEFAULT_CACHE_VALIDITY_DAYS, DEFAULT_FALLBACK_WINDOW_DAYS, GatewayOptions, RateCache,
};
use crate::pipeline::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::tax::{TaxRule, TaxRuleTable};

/// File looked up in the working directory by [`PipelineConfig::load`].
pub const DEFAULT_CONFIG_FILE: &str = "kassabon.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "KASSABON_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    /// Category label (English or Dutch) → deduction percentages.
    #[serde(default)]
    pub tax_rules: BTreeMap<String, TaxRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// JSON cache file; in-memory cache when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,
    pub cache_validity_days: u64,
    pub fallback_window_days: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.frankfurter.app".into(),
            timeout_secs: 10,
            cache_path: None,
            cache_validity_days: DEFAULT_CACHE_VALIDITY_DAYS,
            fallback_window_days: DEFAULT_FALLBACK_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Language code → ISO 4217 code, replacing built-in entries.
    #[serde(default)]
    pub language_defaults: BTreeMap<String, String>,
}

impl PipelineConfig {
    /// Load from defaults, `kassabon.toml` (if present) and the environment,
    /// then validate.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Like [`PipelineConfig::load`] with an explicit TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment_with_file(path.as_ref()))
    }

    /// The provider chain used by [`PipelineConfig::load`].
    pub fn figment() -> Figment {
        Self::figment_with_file(Path::new(DEFAULT_CONFIG_FILE))
    }

    pub fn figment_with_file(path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if path.exists() {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract from any figment and validate.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value.
    ///
    /// # Errors
    ///
    /// The first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.review.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid("review.confidence_threshold", format!("{threshold} is outside 0.0-1.0")));
        }

        let url = &self.rates.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(invalid("rates.base_url", format!("'{url}' is not an http(s) URL")));
        }
        if self.rates.timeout_secs == 0 {
            return Err(invalid("rates.timeout_secs", "must be at least 1".to_string()));
        }

        for (language, code) in &self.currency.language_defaults {
            if !is_known_currency_code(&code.to_ascii_uppercase()) {
                return Err(invalid(
                    &format!("currency.language_defaults.{language}"),
                    format!("unknown currency code '{code}'"),
                ));
            }
        }

        self.tax_overrides().map(|_| ())
    }

    /// Tax rule table with the configured overrides.
    pub fn tax_rule_table(&self) -> Result<TaxRuleTable, ConfigError> {
        Ok(TaxRuleTable::new(self.tax_overrides()?))
    }

    /// Built-in language → currency table with the configured overrides.
    pub fn currency_map(&self) -> Result<CurrencyMap, ConfigError> {
        let mut map = CurrencyMap::default();
        for (language, code) in &self.currency.language_defaults {
            map = map.with_override(language, code)?;
        }
        Ok(map)
    }

    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            fetch_timeout: Duration::from_secs(self.rates.timeout_secs),
            cache_validity_days: self.rates.cache_validity_days,
            fallback_window_days: self.rates.fallback_window_days,
        }
    }

    /// File-backed cache when `rates.cache_path` is set, in-memory otherwise.
    pub fn rate_cache(&self) -> Result<RateCache, ConfigError> {
        match &self.rates.cache_path {
            Some(path) => Ok(RateCache::open(path)?),
            None => Ok(RateCache::in_memory()),
        }
    }

    #[cfg(feature = "frankfurter")]
    pub fn rate_provider(&self) -> Result<crate::fx::FrankfurterProvider, ConfigError> {
        Ok(crate::fx::FrankfurterProvider::with_base_url(
            &self.rates.base_url,
            Duration::from_secs(self.rates.timeout_secs),
        )?)
    }

    fn tax_overrides(&self) -> Result<HashMap<Category, TaxRule>, ConfigError> {
        self.tax_rules
            .iter()
            .map(|(label, rule)| {
                let category = label
                    .parse::<Category>()
                    .map_err(|_| ConfigError::UnknownCategory(label.clone()))?;
                rule.validate().map_err(|source| ConfigError::TaxRule {
                    category: label.clone(),
                    source,
                })?;
                Ok((category, *rule))
            })
            .collect()
    }
}

fn invalid(field: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason,
    }
}
