use std::collections::BTreeMap;

use super::error::RateError;
use crate::core::is_known_currency_code;

/// Built-in language → currency table. Languages spoken under several
/// currencies resolve to one default (English → EUR, since most receipts
/// in English handled here come from the euro area); override through
/// [`CurrencyMap::with_override`].
static BUILTIN: &[(&str, &str)] = &[
    ("nl", "EUR"),
    ("de", "EUR"),
    ("fr", "EUR"),
    ("es", "EUR"),
    ("it", "EUR"),
    ("pt", "EUR"),
    ("en", "EUR"),
    ("fi", "EUR"),
    ("el", "EUR"),
    ("sk", "EUR"),
    ("sl", "EUR"),
    ("et", "EUR"),
    ("lv", "EUR"),
    ("lt", "EUR"),
    ("hr", "EUR"),
    ("tr", "TRY"),
    ("pl", "PLN"),
    ("cs", "CZK"),
    ("hu", "HUF"),
    ("ro", "RON"),
    ("bg", "BGN"),
    ("sv", "SEK"),
    ("da", "DKK"),
    ("nb", "NOK"),
    ("no", "NOK"),
    ("is", "ISK"),
    ("ja", "JPY"),
    ("zh", "CNY"),
    ("ko", "KRW"),
    ("ru", "RUB"),
    ("uk", "UAH"),
    ("th", "THB"),
];

/// Fixed, auditable mapping from a receipt's language to its default currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyMap {
    map: BTreeMap<String, String>,
}

impl Default for CurrencyMap {
    fn default() -> Self {
        Self {
            map: BUILTIN
                .iter()
                .map(|(lang, code)| (lang.to_string(), code.to_string()))
                .collect(),
        }
    }
}

impl CurrencyMap {
    /// A map with no entries; every language is unmapped.
    pub fn empty() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Map `language` to `currency`, replacing any built-in entry.
    ///
    /// # Errors
    ///
    /// [`RateError::UnsupportedCurrency`] for an unknown ISO 4217 code.
    pub fn with_override(mut self, language: &str, currency: &str) -> Result<Self, RateError> {
        let currency = currency.trim().to_ascii_uppercase();
        if !is_known_currency_code(&currency) {
            return Err(RateError::UnsupportedCurrency(currency));
        }
        self.map.insert(language.trim().to_ascii_lowercase(), currency);
        Ok(self)
    }

    /// Default currency for an ISO 639-1 language code.
    pub fn currency_for(&self, language: &str) -> Option<&str> {
        self.map.get(language).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.map.iter().map(|(l, c)| (l.as_str(), c.as_str()))
    }
}
