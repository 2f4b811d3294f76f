//! Shared receipt data model, error kinds, and money helpers.
//!
//! Every stage of the pipeline reads and writes the types defined here.
//! Monetary values are [`rust_decimal::Decimal`] throughout.

mod currencies;
mod error;
mod money;
mod types;

pub(crate) use currencies::{is_currency_symbol, known_currency_code};
pub use currencies::{currency_for_marker, is_known_currency_code};
pub use error::*;
pub use money::*;
pub use types::*;
