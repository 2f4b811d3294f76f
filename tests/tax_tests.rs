use std::collections::HashMap;

use kassabon::core::*;
use kassabon::tax::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn totals(vat: &[(Decimal, Decimal)], total: Decimal) -> Totals {
    let buckets: VatBuckets = vat.iter().copied().collect();
    let excl = total - buckets.total();
    Totals::new(excl, buckets, total)
}

// ---------------------------------------------------------------------------
// Default rules
// ---------------------------------------------------------------------------

#[test]
fn hospitality_gets_no_vat_and_eighty_percent() {
    let t = Totals::new(
        dec!(410.00),
        [(dec!(9), dec!(90.00))].into_iter().collect(),
        dec!(500.00),
    );
    let out = TaxCalculator::default().calculate(&t, Category::RepresentationHospitality);

    assert_eq!(out.vat_deductible_pct, dec!(0));
    assert_eq!(out.ib_deductible_pct, dec!(80));
    assert_eq!(out.amount_excl_vat, dec!(410.00));
    assert_eq!(out.vat_refund, dec!(0.00));
    assert_eq!(out.remainder_after_vat, dec!(500.00));
    assert_eq!(out.profit_deduction, dec!(328.00));
}

#[test]
fn retail_representation_matches_hospitality() {
    let t = totals(&[(dec!(9), dec!(0.97))], dec!(11.80));
    let out = TaxCalculator::default().calculate(&t, Category::RepresentationRetail);
    assert_eq!(out.vat_refund, dec!(0.00));
    assert_eq!(out.profit_deduction, dec!(8.66));
}

#[test]
fn every_other_category_is_fully_deductible() {
    let t = totals(&[(dec!(21), dec!(21.00)), (dec!(9), dec!(0.90))], dec!(131.90));
    for category in Category::ALL.into_iter().filter(|c| !c.is_representation()) {
        let out = TaxCalculator::default().calculate(&t, category);
        assert_eq!(out.vat_refund, dec!(21.90), "{category}");
        assert_eq!(out.remainder_after_vat, dec!(110.00), "{category}");
        assert_eq!(out.profit_deduction, dec!(110.00), "{category}");
    }
}

#[test]
fn zero_vat_receipt() {
    let t = totals(&[], dec!(45.00));
    let out = TaxCalculator::default().calculate(&t, Category::BusinessTraining);
    assert_eq!(out.vat_refund, dec!(0.00));
    assert_eq!(out.amount_excl_vat, dec!(45.00));
    assert_eq!(out.profit_deduction, dec!(45.00));
}

#[test]
fn excl_is_derived_not_trusted() {
    // printed excl is off by a euro; the calculation ignores it
    let t = Totals::new(
        dec!(9.00),
        [(dec!(21), dec!(2.10))].into_iter().collect(),
        dec!(12.10),
    );
    let out = TaxCalculator::default().calculate(&t, Category::OfficeExpenses);
    assert_eq!(out.amount_excl_vat, dec!(10.00));
    assert_eq!(out.profit_deduction, dec!(10.00));
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

#[test]
fn override_replaces_default_for_one_category() {
    let mut overrides = HashMap::new();
    overrides.insert(
        Category::Transportation,
        TaxRule::new(dec!(50), dec!(75)).unwrap(),
    );
    let calc = TaxCalculator::new(TaxRuleTable::new(overrides));
    let t = totals(&[(dec!(21), dec!(10.00))], dec!(60.00));

    let out = calc.calculate(&t, Category::Transportation);
    assert_eq!(out.vat_refund, dec!(5.00));
    assert_eq!(out.remainder_after_vat, dec!(55.00));
    assert_eq!(out.profit_deduction, dec!(37.50));

    let untouched = calc.calculate(&t, Category::OfficeExpenses);
    assert_eq!(untouched.vat_refund, dec!(10.00));
}

#[test]
fn custom_rule_store() {
    struct HalfEverything;

    impl TaxRuleStore for HalfEverything {
        fn override_for(&self, _category: Category) -> Option<TaxRule> {
            TaxRule::new(dec!(50), dec!(50)).ok()
        }
    }

    let table = TaxRuleTable::new(HalfEverything);
    for category in Category::ALL {
        assert_eq!(table.lookup(category).ib_deductible_pct(), dec!(50));
    }
}

#[test]
fn rounding_happens_once() {
    // remainder is taken from the unrounded refund (0.03333)
    let rule = TaxRule::new(dec!(33.33), dec!(33.33)).unwrap();
    let t = totals(&[(dec!(21), dec!(0.10))], dec!(0.58));
    let out = calculate(&t, rule);
    assert_eq!(out.vat_refund, dec!(0.03));
    assert_eq!(out.remainder_after_vat, dec!(0.55));
    assert_eq!(out.profit_deduction, dec!(0.16));
}

#[test]
fn default_rules_table() {
    assert_eq!(default_rule(Category::RepresentationHospitality), TaxRule::REPRESENTATION);
    assert_eq!(default_rule(Category::ProfessionalExpenses), TaxRule::FULL);
    assert!(TaxRule::new(dec!(100.01), dec!(0)).is_err());
}
