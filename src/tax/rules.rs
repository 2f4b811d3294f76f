use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Category;

/// Deduction percentages for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRule {
    /// Share of the VAT reclaimable from the tax office (BTW-aftrek), 0–100.
    #[serde(rename = "vat_deductible")]
    vat_deductible_pct: Decimal,
    /// Share of the net amount deductible from profit (IB-aftrek), 0–100.
    #[serde(rename = "ib_deductible")]
    ib_deductible_pct: Decimal,
}

/// Invalid tax rule values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TaxRuleError {
    #[error("{field} percentage {value} is outside 0-100")]
    OutOfRange { field: &'static str, value: Decimal },
}

impl TaxRule {
    /// Fully deductible: 100% VAT, 100% profit.
    pub const FULL: TaxRule = TaxRule {
        vat_deductible_pct: dec!(100),
        ib_deductible_pct: dec!(100),
    };

    /// Representation costs: no VAT refund, 80% profit deduction.
    pub const REPRESENTATION: TaxRule = TaxRule {
        vat_deductible_pct: dec!(0),
        ib_deductible_pct: dec!(80),
    };

    /// # Errors
    ///
    /// [`TaxRuleError::OutOfRange`] when either percentage is outside 0–100.
    pub fn new(vat_deductible_pct: Decimal, ib_deductible_pct: Decimal) -> Result<Self, TaxRuleError> {
        check_pct("vat_deductible", vat_deductible_pct)?;
        check_pct("ib_deductible", ib_deductible_pct)?;
        Ok(Self {
            vat_deductible_pct,
            ib_deductible_pct,
        })
    }

    pub fn vat_deductible_pct(&self) -> Decimal {
        self.vat_deductible_pct
    }

    pub fn ib_deductible_pct(&self) -> Decimal {
        self.ib_deductible_pct
    }

    /// Re-check values that bypassed [`TaxRule::new`] (deserialization).
    pub fn validate(&self) -> Result<(), TaxRuleError> {
        check_pct("vat_deductible", self.vat_deductible_pct)?;
        check_pct("ib_deductible", self.ib_deductible_pct)
    }
}

fn check_pct(field: &'static str, value: Decimal) -> Result<(), TaxRuleError> {
    if (Decimal::ZERO..=dec!(100)).contains(&value) {
        Ok(())
    } else {
        Err(TaxRuleError::OutOfRange { field, value })
    }
}

/// Built-in rule for a category, used when no override is configured.
pub fn default_rule(category: Category) -> TaxRule {
    if category.is_representation() {
        TaxRule::REPRESENTATION
    } else {
        TaxRule::FULL
    }
}

/// Source of user-configured rule overrides, keyed by category.
pub trait TaxRuleStore: Send + Sync {
    fn override_for(&self, category: Category) -> Option<TaxRule>;
}

impl TaxRuleStore for HashMap<Category, TaxRule> {
    fn override_for(&self, category: Category) -> Option<TaxRule> {
        self.get(&category).copied()
    }
}

/// Category → rule lookup: configured override first, built-in default otherwise.
#[derive(Clone)]
pub struct TaxRuleTable {
    overrides: Arc<dyn TaxRuleStore>,
}

impl std::fmt::Debug for TaxRuleTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(Category::ALL.iter().map(|c| (c.label(), self.lookup(*c))))
            .finish()
    }
}

impl Default for TaxRuleTable {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl TaxRuleTable {
    pub fn new(overrides: impl TaxRuleStore + 'static) -> Self {
        Self {
            overrides: Arc::new(overrides),
        }
    }

    /// Never fails; a missing override resolves to [`default_rule`].
    pub fn lookup(&self, category: Category) -> TaxRule {
        self.overrides
            .override_for(category)
            .unwrap_or_else(|| default_rule(category))
    }
}
