//! Receipt text → [`StructuredRecord`](crate::core::StructuredRecord).
//!
//! Extraction is rule based: lines are classified by keyword (total,
//! subtotal, VAT, payment), amounts are parsed in either decimal style
//! and the remaining lines are read as items. Every heuristic that had
//! to guess leaves an [`ExtractionWarning`](crate::core::ExtractionWarning)
//! and lowers the confidence score.

mod amounts;
mod extractor;
mod language;

pub use amounts::{amounts_in, last_amount, parse_amount, percent_in};
pub use extractor::{Extractor, INCONSISTENT_TOTALS_CAP, TextExtractor};
pub use language::{MIN_INDICATORS, detect_language};
pub(crate) use language::tokens;
