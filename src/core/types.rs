use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::{CategoryError, ErrorKind, PipelineError, Stage};
use super::money::TOTALS_EPSILON;

/// Currency every record is normalized into.
pub const BASE_CURRENCY: &str = "EUR";

/// Language code used when no language could be determined.
pub const UNDETERMINED_LANGUAGE: &str = "und";

/// Language whose receipts are always in the base currency.
pub const HOME_LANGUAGE: &str = "nl";

/// Dutch VAT rates (BTW) currently in force: 0%, 9% (laag), 21% (hoog).
/// Buckets are keyed by rate, so other rates are stored as-is.
pub const DUTCH_VAT_RATES: [Decimal; 3] = [dec!(0), dec!(9), dec!(21)];

/// Kind of upload the raw text was acquired from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeHint {
    /// Digital receipt, embedded text.
    Pdf,
    /// Photographed or scanned receipt, recognized text.
    Image,
}

impl FromStr for MimeHint {
    type Err = PipelineError;

    /// Accepts MIME types (`application/pdf`, `image/png`, …) and bare
    /// file extensions (`pdf`, `jpg`, …).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let s = s.strip_prefix('.').unwrap_or(&s);
        match s {
            "pdf" | "application/pdf" => Ok(Self::Pdf),
            "image" | "png" | "jpg" | "jpeg" | "image/png" | "image/jpeg" | "image/jpg" => {
                Ok(Self::Image)
            }
            other => Err(PipelineError::new(
                Stage::Intake,
                ErrorKind::UnsupportedMime,
                format!("unsupported upload type '{other}' (expected pdf, png, jpg or jpeg)"),
            )),
        }
    }
}

/// Output of the text acquisition step. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    text: String,
    source_confidence: f64,
    receipt_date: NaiveDate,
    mime: MimeHint,
}

impl RawInput {
    /// Validate and wrap acquired text.
    ///
    /// # Errors
    ///
    /// `MalformedInput` when the text is blank or the confidence is not
    /// a number within 0.0–1.0.
    pub fn new(
        text: impl Into<String>,
        source_confidence: f64,
        receipt_date: NaiveDate,
        mime: MimeHint,
    ) -> Result<Self, PipelineError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PipelineError::new(
                Stage::Intake,
                ErrorKind::MalformedInput,
                "receipt text is empty",
            ));
        }
        if !(0.0..=1.0).contains(&source_confidence) {
            return Err(PipelineError::new(
                Stage::Intake,
                ErrorKind::MalformedInput,
                format!("source confidence {source_confidence} is outside 0.0-1.0"),
            ));
        }
        Ok(Self {
            text,
            source_confidence,
            receipt_date,
            mime,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_confidence(&self) -> f64 {
        self.source_confidence
    }

    /// Upload date; stands in for the transaction date when the text has none.
    pub fn receipt_date(&self) -> NaiveDate {
        self.receipt_date
    }

    pub fn mime(&self) -> MimeHint {
        self.mime
    }
}

/// A single purchased item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_amount: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_amount: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_amount,
        }
    }

    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_amount
    }
}

/// VAT amounts keyed by rate percentage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VatBuckets(BTreeMap<Decimal, Decimal>);

impl VatBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the bucket for `rate`, creating it if needed.
    pub fn add(&mut self, rate: Decimal, amount: Decimal) {
        *self.0.entry(rate.normalize()).or_insert(Decimal::ZERO) += amount;
    }

    /// Replace the bucket for `rate`.
    pub fn set(&mut self, rate: Decimal, amount: Decimal) {
        self.0.insert(rate.normalize(), amount);
    }

    /// Amount in the bucket for `rate`; zero when absent.
    pub fn get(&self, rate: Decimal) -> Decimal {
        self.0.get(&rate.normalize()).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn total(&self) -> Decimal {
        self.0.values().copied().sum()
    }

    pub fn rates(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Decimal, Decimal)> + '_ {
        self.0.iter().map(|(rate, amount)| (*rate, *amount))
    }

    /// Apply `f` to every bucket amount independently.
    pub fn map_amounts(&self, f: impl Fn(Decimal) -> Decimal) -> Self {
        Self(self.0.iter().map(|(rate, amount)| (*rate, f(*amount))).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Decimal, Decimal)> for VatBuckets {
    fn from_iter<I: IntoIterator<Item = (Decimal, Decimal)>>(iter: I) -> Self {
        let mut buckets = Self::new();
        for (rate, amount) in iter {
            buckets.add(rate, amount);
        }
        buckets
    }
}

/// Receipt totals as printed (or converted). Never auto-corrected:
/// use [`Totals::is_consistent`] to check the arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub amount_excl_vat: Decimal,
    pub vat: VatBuckets,
    pub total_incl_vat: Decimal,
}

impl Totals {
    pub fn new(amount_excl_vat: Decimal, vat: VatBuckets, total_incl_vat: Decimal) -> Self {
        Self {
            amount_excl_vat,
            vat,
            total_incl_vat,
        }
    }

    pub fn vat_total(&self) -> Decimal {
        self.vat.total()
    }

    /// `total_incl_vat − (amount_excl_vat + Σ vat)`.
    pub fn discrepancy(&self) -> Decimal {
        self.total_incl_vat - (self.amount_excl_vat + self.vat_total())
    }

    pub fn is_consistent(&self) -> bool {
        self.discrepancy().abs() <= TOTALS_EPSILON
    }
}

/// Expense categories for Dutch freelance bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Beroepskosten: tools, equipment, software.
    #[serde(rename = "Professional-expenses")]
    ProfessionalExpenses,
    /// Kantoorkosten: office supplies.
    #[serde(rename = "Office-expenses")]
    OfficeExpenses,
    /// Reis- en verblijfkosten: travel and accommodation.
    #[serde(rename = "Travel-and-accommodation")]
    TravelAndAccommodation,
    /// Representatiekosten type 1: food and drinks from retail.
    #[serde(rename = "Representation-Type1-Retail")]
    RepresentationRetail,
    /// Representatiekosten type 2: restaurants, cafés, bars.
    #[serde(rename = "Representation-Type2-Hospitality")]
    RepresentationHospitality,
    /// Vervoerskosten: fuel, parking, public transport, taxi.
    #[serde(rename = "Transportation")]
    Transportation,
    /// Zakelijke opleidingskosten: courses and study material.
    #[serde(rename = "Business-training")]
    BusinessTraining,
}

impl Category {
    /// The allow-list, in display order.
    pub const ALL: [Category; 7] = [
        Self::ProfessionalExpenses,
        Self::OfficeExpenses,
        Self::TravelAndAccommodation,
        Self::RepresentationRetail,
        Self::RepresentationHospitality,
        Self::Transportation,
        Self::BusinessTraining,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProfessionalExpenses => "Professional-expenses",
            Self::OfficeExpenses => "Office-expenses",
            Self::TravelAndAccommodation => "Travel-and-accommodation",
            Self::RepresentationRetail => "Representation-Type1-Retail",
            Self::RepresentationHospitality => "Representation-Type2-Hospitality",
            Self::Transportation => "Transportation",
            Self::BusinessTraining => "Business-training",
        }
    }

    /// Label used by the Dutch bookkeeping sheets.
    pub fn dutch_label(&self) -> &'static str {
        match self {
            Self::ProfessionalExpenses => "Beroepskosten",
            Self::OfficeExpenses => "Kantoorkosten",
            Self::TravelAndAccommodation => "Reis- en verblijfkosten",
            Self::RepresentationRetail => "Representatiekosten - Type 1 (Supermarket)",
            Self::RepresentationHospitality => "Representatiekosten - Type 2 (Horeca)",
            Self::Transportation => "Vervoerskosten",
            Self::BusinessTraining => "Zakelijke opleidingskosten",
        }
    }

    pub fn is_representation(&self) -> bool {
        matches!(
            self,
            Self::RepresentationRetail | Self::RepresentationHospitality
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = CategoryError;

    /// Parse an English or Dutch label, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| {
                c.label().eq_ignore_ascii_case(wanted) || c.dutch_label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| CategoryError::NotAllowed(wanted.to_string()))
    }
}

/// Why extraction confidence was lowered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// Printed totals do not add up; left as printed.
    InconsistentTotals { discrepancy: Decimal },
    MissingVendor,
    /// Transaction date taken from the upload date.
    MissingDate,
    NoLineItems,
    NoVatBreakdown,
    /// A VAT line without a percentage was booked under this rate.
    VatRateAssumed { rate: Decimal },
    /// No language indicators; EUR assumed.
    UndeterminedLanguage,
    /// No total keyword; the last amount after a currency marker was used.
    TotalFromCurrencyMarker,
    /// A Dutch receipt carried a foreign currency marker; EUR kept.
    ForeignCurrencyIgnored { currency: String },
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InconsistentTotals { discrepancy } => {
                write!(f, "totals do not add up (off by {discrepancy})")
            }
            Self::MissingVendor => f.write_str("vendor name not found"),
            Self::MissingDate => f.write_str("transaction date not found, upload date used"),
            Self::NoLineItems => f.write_str("no line items found"),
            Self::NoVatBreakdown => f.write_str("no VAT amounts found"),
            Self::VatRateAssumed { rate } => write!(f, "VAT rate not printed, {rate}% assumed"),
            Self::UndeterminedLanguage => f.write_str("language not determined, EUR assumed"),
            Self::TotalFromCurrencyMarker => {
                f.write_str("total taken from last amount with a currency marker")
            }
            Self::ForeignCurrencyIgnored { currency } => {
                write!(f, "{currency} marker on a Dutch receipt ignored, EUR kept")
            }
        }
    }
}

/// Where an exchange rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    /// Fetched from the rate service during this lookup.
    Live,
    /// Exact `(pair, date)` cache hit within the validity window.
    Cache,
    /// Nearby cached rate used because the live source failed.
    Fallback,
}

impl fmt::Display for RateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Cache => "cache",
            Self::Fallback => "fallback",
        })
    }
}

/// Audit trail of a currency conversion. Fields are read-only; the
/// original amounts are kept for the retention period exactly as printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionMetadata {
    original_currency: String,
    original_amounts: Totals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exchange_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rate_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rate_source: Option<RateSource>,
}

impl ConversionMetadata {
    pub(crate) fn converted(
        original_currency: impl Into<String>,
        original_amounts: Totals,
        exchange_rate: Decimal,
        rate_date: NaiveDate,
        rate_source: RateSource,
    ) -> Self {
        Self {
            original_currency: original_currency.into(),
            original_amounts,
            exchange_rate: Some(exchange_rate),
            rate_date: Some(rate_date),
            rate_source: Some(rate_source),
        }
    }

    /// Conversion attempted but no rate could be resolved.
    pub(crate) fn unresolved(original_currency: impl Into<String>, original_amounts: Totals) -> Self {
        Self {
            original_currency: original_currency.into(),
            original_amounts,
            exchange_rate: None,
            rate_date: None,
            rate_source: None,
        }
    }

    pub fn original_currency(&self) -> &str {
        &self.original_currency
    }

    pub fn original_amounts(&self) -> &Totals {
        &self.original_amounts
    }

    pub fn exchange_rate(&self) -> Option<Decimal> {
        self.exchange_rate
    }

    pub fn rate_date(&self) -> Option<NaiveDate> {
        self.rate_date
    }

    pub fn rate_source(&self) -> Option<RateSource> {
        self.rate_source
    }

    pub fn is_resolved(&self) -> bool {
        self.rate_source.is_some()
    }
}

/// Working record, filled in stage by stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredRecord {
    pub vendor_name: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    /// Receipt or invoice number, when printed.
    pub receipt_number: Option<String>,
    /// ISO 639-1 code, or `und`.
    pub language: String,
    pub line_items: Vec<LineItem>,
    pub totals: Option<Totals>,
    /// ISO 4217 code of the amounts in `totals`.
    pub currency: String,
    pub category: Option<Category>,
    /// 0.0–1.0.
    pub extraction_confidence: f64,
    pub warnings: Vec<ExtractionWarning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionMetadata>,
}

impl Default for StructuredRecord {
    fn default() -> Self {
        Self {
            vendor_name: None,
            transaction_date: None,
            receipt_number: None,
            language: UNDETERMINED_LANGUAGE.to_string(),
            line_items: Vec::new(),
            totals: None,
            currency: BASE_CURRENCY.to_string(),
            category: None,
            extraction_confidence: 0.0,
            warnings: Vec::new(),
            conversion: None,
        }
    }
}

impl StructuredRecord {
    pub fn is_base_currency(&self) -> bool {
        self.currency == BASE_CURRENCY
    }

    pub fn has_warning(&self, warning: &ExtractionWarning) -> bool {
        self.warnings.contains(warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn mime_hint_parsing() {
        assert_eq!("application/pdf".parse::<MimeHint>().unwrap(), MimeHint::Pdf);
        assert_eq!(".JPG".parse::<MimeHint>().unwrap(), MimeHint::Image);
        let err = "text/html".parse::<MimeHint>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedMime);
        assert_eq!(err.stage, Stage::Intake);
    }

    #[test]
    fn raw_input_rejects_blank_text() {
        let err = RawInput::new("  \n", 0.9, date(2025, 1, 15), MimeHint::Pdf).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedInput);
    }

    #[test]
    fn raw_input_rejects_bad_confidence() {
        assert!(RawInput::new("Totaal 1,00", 1.5, date(2025, 1, 15), MimeHint::Pdf).is_err());
        assert!(RawInput::new("Totaal 1,00", f64::NAN, date(2025, 1, 15), MimeHint::Pdf).is_err());
        assert!(RawInput::new("Totaal 1,00", 0.0, date(2025, 1, 15), MimeHint::Pdf).is_ok());
    }

    #[test]
    fn vat_buckets_merge_equal_rates() {
        let mut vat = VatBuckets::new();
        vat.add(dec!(21), dec!(2.10));
        vat.add(dec!(21.00), dec!(1.00));
        vat.add(dec!(9), dec!(0.45));
        assert_eq!(vat.len(), 2);
        assert_eq!(vat.get(dec!(21)), dec!(3.10));
        assert_eq!(vat.get(dec!(0)), dec!(0));
        assert_eq!(vat.total(), dec!(3.55));
    }

    #[test]
    fn totals_consistency() {
        let vat: VatBuckets = [(dec!(21), dec!(2.10))].into_iter().collect();
        let ok = Totals::new(dec!(10.00), vat.clone(), dec!(12.10));
        assert!(ok.is_consistent());
        let within = Totals::new(dec!(10.00), vat.clone(), dec!(12.11));
        assert!(within.is_consistent());
        let off = Totals::new(dec!(10.00), vat, dec!(12.50));
        assert!(!off.is_consistent());
        assert_eq!(off.discrepancy(), dec!(0.40));
    }

    #[test]
    fn category_labels_round_trip() {
        for c in Category::ALL {
            assert_eq!(c.label().parse::<Category>().unwrap(), c);
            assert_eq!(c.dutch_label().parse::<Category>().unwrap(), c);
        }
        assert_eq!(
            "  kantoorkosten ".parse::<Category>().unwrap(),
            Category::OfficeExpenses
        );
        assert_eq!(
            "Groceries".parse::<Category>(),
            Err(CategoryError::NotAllowed("Groceries".into()))
        );
    }

    #[test]
    fn category_serializes_as_label() {
        let json = serde_json::to_string(&Category::RepresentationHospitality).unwrap();
        assert_eq!(json, "\"Representation-Type2-Hospitality\"");
    }

    #[test]
    fn unresolved_conversion_omits_rate_fields() {
        let totals = Totals::new(dec!(400), VatBuckets::new(), dec!(400));
        let meta = ConversionMetadata::unresolved("TRY", totals);
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("rate_source").is_none());
        assert!(json.get("exchange_rate").is_none());
        assert_eq!(json["original_currency"], "TRY");
        assert!(!meta.is_resolved());
    }
}
