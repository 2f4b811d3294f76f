//! Property-based tests for amount parsing, tax figures and conversion.
//!
//! Run with: `cargo test --test proptest_tests`

use std::sync::Arc;

use chrono::NaiveDate;
use kassabon::core::*;
use kassabon::extract::{Extractor, TextExtractor, parse_amount};
use kassabon::fx::*;
use kassabon::tax::{TaxCalculator, TaxRule, calculate};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

/// Amount in cents, up to 1 million.
fn cents() -> impl Strategy<Value = i64> {
    0i64..100_000_000
}

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn group_thousands(units: i64, sep: char) -> String {
    let digits = units.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}

struct FixedRate(Decimal);

impl RateProvider for FixedRate {
    async fn fetch(&self, _pair: &CurrencyPair, date: NaiveDate) -> Result<Quote, RateError> {
        Ok(Quote { rate: self.0, date })
    }
}

proptest! {
    #[test]
    fn both_locales_parse_to_the_same_amount(c in cents()) {
        let units = c / 100;
        let frac = c % 100;
        let dutch = format!("{},{frac:02}", group_thousands(units, '.'));
        let english = format!("{}.{frac:02}", group_thousands(units, ','));

        prop_assert_eq!(parse_amount(&dutch), Some(money(c)));
        prop_assert_eq!(parse_amount(&english), Some(money(c)));
    }

    #[test]
    fn tax_figures_stay_within_bounds(
        vat_cents in 0i64..5_000_000,
        excl_cents in 0i64..50_000_000,
        vat_pct in 0u32..=100,
        ib_pct in 0u32..=100,
    ) {
        let vat = money(vat_cents);
        let total = money(excl_cents) + vat;
        let totals = Totals::new(money(excl_cents), [(Decimal::from(21), vat)].into_iter().collect(), total);
        let rule = TaxRule::new(Decimal::from(vat_pct), Decimal::from(ib_pct)).unwrap();

        let out = calculate(&totals, rule);
        prop_assert!(out.vat_refund >= Decimal::ZERO && out.vat_refund <= vat);
        prop_assert!(out.profit_deduction >= Decimal::ZERO && out.profit_deduction <= out.amount_excl_vat);
        prop_assert_eq!(out.amount_excl_vat, money(excl_cents));
        prop_assert!((out.remainder_after_vat + out.vat_refund - total).abs() <= Decimal::new(1, 2));
        for figure in [out.vat_refund, out.remainder_after_vat, out.profit_deduction] {
            prop_assert!(figure.scale() <= 2, "{figure} has more than two decimals");
        }
    }

    #[test]
    fn tax_calculation_is_deterministic(
        excl_cents in 0i64..50_000_000,
        low_cents in 0i64..500_000,
        high_cents in 0i64..5_000_000,
    ) {
        let vat: VatBuckets = [
            (Decimal::from(9), money(low_cents)),
            (Decimal::from(21), money(high_cents)),
        ]
        .into_iter()
        .collect();
        let total = money(excl_cents) + vat.total();
        let totals = Totals::new(money(excl_cents), vat, total);
        prop_assume!(totals.is_consistent());

        let calculator = TaxCalculator::default();
        for category in Category::ALL {
            let first = calculator.calculate(&totals, category);
            let second = calculator.calculate(&totals, category);
            prop_assert_eq!(&first, &second, "{:?}", category);
        }
    }

    #[test]
    fn converted_totals_always_add_up(
        excl_cents in 1i64..10_000_000,
        low_cents in 0i64..100_000,
        high_cents in 0i64..1_000_000,
        rate_micros in 1i64..5_000_000,
    ) {
        let vat: VatBuckets = [
            (Decimal::from(9), money(low_cents)),
            (Decimal::from(21), money(high_cents)),
        ]
        .into_iter()
        .collect();
        let total = money(excl_cents) + vat.total();
        let record = StructuredRecord {
            currency: "USD".into(),
            transaction_date: Some(date()),
            totals: Some(Totals::new(money(excl_cents), vat, total)),
            ..StructuredRecord::default()
        };
        let rate = Decimal::new(rate_micros, 6);
        let gateway = ExchangeRateGateway::new(FixedRate(rate), Arc::new(RateCache::in_memory()));
        let normalizer = CurrencyNormalizer::new(gateway);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let out = runtime.block_on(normalizer.normalize(record)).into_record();

        let totals = out.totals.unwrap();
        prop_assert!(totals.is_consistent(), "{totals:?}");
        prop_assert_eq!(out.currency, "EUR");
        prop_assert_eq!(out.conversion.unwrap().original_amounts().total_incl_vat, total);
    }

    #[test]
    fn extraction_never_panics(text in "\\PC{1,300}") {
        prop_assume!(!text.trim().is_empty());
        let input = RawInput::new(text, 1.0, date(), MimeHint::Image).unwrap();
        if let Ok(record) = TextExtractor::default().extract(&input) {
            prop_assert!((0.0..=1.0).contains(&record.extraction_confidence));
            prop_assert!(record.totals.is_some());
        }
    }

    #[test]
    fn receipt_lines_survive_noise(
        total_cents in 1i64..1_000_000,
        noise in proptest::collection::vec("[a-z]{3,10}", 0..5),
    ) {
        let mut text = String::from("Winkel Centrum\n");
        for word in &noise {
            text.push_str(word);
            text.push('\n');
        }
        text.push_str(&format!("Totaal {}\n", money(total_cents).to_string().replace('.', ",")));
        let input = RawInput::new(text, 1.0, date(), MimeHint::Pdf).unwrap();

        let record = TextExtractor::default().extract(&input).unwrap();
        prop_assert_eq!(record.totals.unwrap().total_incl_vat, money(total_cents));
    }
}
