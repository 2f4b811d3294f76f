use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rules::{TaxRule, TaxRuleTable};
use crate::core::{Category, Totals, percent_of, round_money};

/// Deduction and refund figures for one EUR record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxOutcome {
    pub vat_deductible_pct: Decimal,
    pub ib_deductible_pct: Decimal,
    /// `total_incl_vat − Σ vat`.
    pub amount_excl_vat: Decimal,
    /// VAT reclaimable through the BTW return.
    pub vat_refund: Decimal,
    /// What the receipt costs after the VAT refund.
    pub remainder_after_vat: Decimal,
    /// Amount deductible from profit for income tax.
    pub profit_deduction: Decimal,
}

/// Apply `rule` to `totals`.
///
/// Intermediate values keep full precision; every output is rounded to
/// cents (half-to-even) once, at the end. The printed excl.-VAT amount is
/// not used: it is always re-derived from total and VAT.
pub fn calculate(totals: &Totals, rule: TaxRule) -> TaxOutcome {
    let total = totals.total_incl_vat;
    let vat = totals.vat_total();

    let amount_excl_vat = total - vat;
    let vat_refund = percent_of(vat, rule.vat_deductible_pct());
    let remainder_after_vat = total - vat_refund;
    let profit_deduction = percent_of(amount_excl_vat, rule.ib_deductible_pct());

    TaxOutcome {
        vat_deductible_pct: rule.vat_deductible_pct(),
        ib_deductible_pct: rule.ib_deductible_pct(),
        amount_excl_vat: round_money(amount_excl_vat),
        vat_refund: round_money(vat_refund),
        remainder_after_vat: round_money(remainder_after_vat),
        profit_deduction: round_money(profit_deduction),
    }
}

/// Tax calculation stage: looks up the category's rule and applies it.
#[derive(Debug, Clone, Default)]
pub struct TaxCalculator {
    rules: TaxRuleTable,
}

impl TaxCalculator {
    pub fn new(rules: TaxRuleTable) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &TaxRuleTable {
        &self.rules
    }

    pub fn calculate(&self, totals: &Totals, category: Category) -> TaxOutcome {
        calculate(totals, self.rules.lookup(category))
    }
}
