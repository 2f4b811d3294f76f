//! # kassabon
//!
//! Turns the text of a scanned or digital receipt into a bookkeeping record
//! for a Dutch small business: vendor, date, line items, VAT buckets, an
//! expense category, amounts in EUR and the deductible share of VAT and
//! profit.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use kassabon::category::{Categorizer, KeywordCategorizer};
//! use kassabon::core::{Category, MimeHint, RawInput};
//! use kassabon::extract::{Extractor, TextExtractor};
//! use kassabon::tax::TaxCalculator;
//! use rust_decimal_macros::dec;
//!
//! let text = "Albert Heijn 1234\n\
//!             Datum: 15-01-2025 14:02\n\
//!             Koffie 2 x 3,50 7,00\n\
//!             Croissant 2,95\n\
//!             Appels 1,85\n\
//!             BTW 9% 10,83 0,97 11,80\n\
//!             Totaal 11,80\n\
//!             PIN 11,80";
//! let date = NaiveDate::from_ymd_opt(2025, 1, 16).unwrap();
//! let input = RawInput::new(text, 0.95, date, MimeHint::Pdf).unwrap();
//!
//! let mut record = TextExtractor::default().extract(&input).unwrap();
//! assert_eq!(record.language, "nl");
//! assert_eq!(record.currency, "EUR");
//!
//! let category = KeywordCategorizer.categorize(&record).unwrap().category();
//! assert_eq!(category, Category::RepresentationRetail);
//! record.category = Some(category);
//!
//! let tax = TaxCalculator::default().calculate(record.totals.as_ref().unwrap(), category);
//! assert_eq!(tax.vat_refund, dec!(0.00));
//! assert_eq!(tax.profit_deduction, dec!(8.66));
//! ```
//!
//! The full run, including currency normalization, goes through
//! [`pipeline::Pipeline`].
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `frankfurter` (default) | Live rates from the Frankfurter API via `reqwest` |
//! | `config` (default) | Layered TOML / environment configuration via `figment` |

pub mod category;
pub mod core;
pub mod extract;
pub mod fx;
pub mod pipeline;
pub mod tax;

#[cfg(feature = "config")]
pub mod config;

// Re-export the types every caller touches
pub use crate::core::{
    Category, ErrorKind, MimeHint, PipelineError, RawInput, Stage, StructuredRecord, Totals,
};
pub use crate::pipeline::{Pipeline, PipelineOutcome, PipelineState, ReviewReason};
