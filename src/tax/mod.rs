//! Dutch deduction rules and the tax calculation stage.
//!
//! Each expense category maps to two percentages: how much of the VAT is
//! reclaimable (BTW-aftrek) and how much of the net amount reduces profit
//! for income tax (IB-aftrek). Representation costs are the exception to
//! the 100/100 default: 0% VAT, 80% profit.
//!
//! # Example
//!
//! ```rust
//! use kassabon::core::{Category, Totals, VatBuckets};
//! use kassabon::tax::TaxCalculator;
//! use rust_decimal_macros::dec;
//!
//! let vat: VatBuckets = [(dec!(9), dec!(90.00))].into_iter().collect();
//! let totals = Totals::new(dec!(410.00), vat, dec!(500.00));
//!
//! let out = TaxCalculator::default().calculate(&totals, Category::RepresentationHospitality);
//! assert_eq!(out.vat_refund, dec!(0.00));
//! assert_eq!(out.profit_deduction, dec!(328.00));
//! ```

mod calculator;
mod rules;

pub use calculator::{TaxCalculator, TaxOutcome, calculate};
pub use rules::{TaxRule, TaxRuleError, TaxRuleStore, TaxRuleTable, default_rule};
