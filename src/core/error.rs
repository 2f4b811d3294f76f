use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pipeline stage a failure or review decision originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Validation of the raw input handed over by text acquisition.
    Intake,
    /// Raw text → structured record.
    Extraction,
    /// Category assignment.
    Categorization,
    /// Conversion of foreign-currency amounts into EUR.
    CurrencyNormalization,
    /// Deduction and refund figures.
    TaxCalculation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Extraction => "extraction",
            Self::Categorization => "categorization",
            Self::CurrencyNormalization => "currency-normalization",
            Self::TaxCalculation => "tax-calculation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of everything that can stop a receipt short of `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Empty text or a source confidence outside 0.0–1.0.
    MalformedInput,
    /// The upload is neither a PDF nor an image.
    UnsupportedMime,
    /// No usable monetary total in the text.
    UnparseableReceipt,
    /// A categorizer produced a label outside the allow-list.
    InvalidCategory,
    /// Extraction confidence under the review threshold.
    LowConfidenceExtraction,
    /// No live rate and no fallback rate for a foreign receipt.
    ConversionUnresolved,
    /// Rate source unreachable. Internal to the gateway.
    RateSourceUnavailable,
}

impl ErrorKind {
    /// Fatal kinds abort the run; the rest end up in manual review.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput | Self::UnsupportedMime | Self::UnparseableReceipt | Self::InvalidCategory
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedInput => "MalformedInput",
            Self::UnsupportedMime => "UnsupportedMime",
            Self::UnparseableReceipt => "UnparseableReceipt",
            Self::InvalidCategory => "InvalidCategory",
            Self::LowConfidenceExtraction => "LowConfidenceExtraction",
            Self::ConversionUnresolved => "ConversionUnresolved",
            Self::RateSourceUnavailable => "RateSourceUnavailable",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal stage error, carried verbatim into `PipelineOutcome::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{stage} failed ({kind}): {message}")]
pub struct PipelineError {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: Stage, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }
}

/// Errors from category parsing and categorizer contracts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CategoryError {
    /// The label is not one of the seven allowed expense categories.
    #[error("category '{0}' is not in the allow-list")]
    NotAllowed(String),
}
