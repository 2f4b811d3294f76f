use thiserror::Error;

use crate::fx::RateError;
use crate::tax::TaxRuleError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Figment extraction or merge error.
    #[error("configuration error: {0}")]
    Figment(#[from] figment::Error),

    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A `tax_rules` key that is not one of the seven categories.
    #[error("unknown expense category '{0}' in tax_rules")]
    UnknownCategory(String),

    #[error("invalid tax rule for '{category}': {source}")]
    TaxRule {
        category: String,
        #[source]
        source: TaxRuleError,
    },

    /// Rate cache or rate provider could not be set up.
    #[error("rate setup failed: {0}")]
    Rates(#[from] RateError),
}
