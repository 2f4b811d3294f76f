use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a pipeline run is. The happy path runs top to bottom; a run can
/// leave it for `ManualReview` or `Failed` from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineState {
    Received,
    TextAcquired,
    Structured,
    Categorized,
    CurrencyNormalized,
    TaxCalculated,
    Completed,
    ManualReview,
    Failed,
}

impl PipelineState {
    /// Next state on the happy path; `None` for terminal states.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Received => Some(Self::TextAcquired),
            Self::TextAcquired => Some(Self::Structured),
            Self::Structured => Some(Self::Categorized),
            Self::Categorized => Some(Self::CurrencyNormalized),
            Self::CurrencyNormalized => Some(Self::TaxCalculated),
            Self::TaxCalculated => Some(Self::Completed),
            Self::Completed | Self::ManualReview | Self::Failed => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::ManualReview | Self::Failed)
    }

    /// Whether a run in this state may move to `to`.
    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(to, Self::ManualReview | Self::Failed) || self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::TextAcquired => "text-acquired",
            Self::Structured => "structured",
            Self::Categorized => "categorized",
            Self::CurrencyNormalized => "currency-normalized",
            Self::TaxCalculated => "tax-calculated",
            Self::Completed => "completed",
            Self::ManualReview => "manual-review",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run was handed to a human.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewReason {
    /// Extraction confidence under the threshold.
    LowConfidenceExtraction,
    /// The categorizer could not pick a single category.
    AmbiguousCategory,
    /// No live or fallback exchange rate.
    CurrencyConversionFailed,
}

impl ReviewReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowConfidenceExtraction => "low-confidence-extraction",
            Self::AmbiguousCategory => "ambiguous-category",
            Self::CurrencyConversionFailed => "currency-conversion-failed",
        }
    }
}

impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
