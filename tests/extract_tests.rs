use chrono::NaiveDate;
use kassabon::core::*;
use kassabon::extract::{Extractor, INCONSISTENT_TOTALS_CAP, TextExtractor, detect_language};
use kassabon::fx::CurrencyMap;
use rust_decimal_macros::dec;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn extract(text: &str, source_confidence: f64) -> Result<StructuredRecord, PipelineError> {
    let input = RawInput::new(text, source_confidence, date(2025, 3, 31), MimeHint::Image).unwrap();
    TextExtractor::default().extract(&input)
}

const SUPERMARKET_NL: &str = "\
Albert Heijn 1234
Damrak 12 Amsterdam
Datum: 15-01-2025 14:02
Bon: 0042-17
Koffie 2 x 3,50 7,00
Croissant 2,95
Appels 1,85
Subtotaal 11,80
BTW 9% 10,83 0,97 11,80
Totaal 11,80
PIN 11,80
Bedankt en tot ziens";

const MIGROS_TR: &str = "\
MIGROS TICARET A.S.
Ataturk Cd. No:12 Istanbul
Tarih: 15/01/2025 Saat: 14:22
Fiş No: 0042
Ekmek 2 x 15,00 30,00
Peynir 470,00
KDV %20 83,33
TOPLAM *500,00 TL
NAKIT 500,00";

const COFFEE_EN: &str = "\
Coffee Corner Ltd
12 High Street London
Date: 03/10/2024
2 x Flat White 6.40
Croissant 3.20
VAT 20% 1.60
Total £9.60
Card 9.60
Thank you!";

// ---------------------------------------------------------------------------
// Dutch receipts
// ---------------------------------------------------------------------------

#[test]
fn dutch_supermarket_receipt() {
    let record = extract(SUPERMARKET_NL, 0.95).unwrap();

    assert_eq!(record.vendor_name.as_deref(), Some("Albert Heijn 1234"));
    assert_eq!(record.transaction_date, Some(date(2025, 1, 15)));
    assert_eq!(record.receipt_number.as_deref(), Some("0042-17"));
    assert_eq!(record.language, "nl");
    assert_eq!(record.currency, "EUR");

    let totals = record.totals.as_ref().unwrap();
    assert_eq!(totals.total_incl_vat, dec!(11.80));
    assert_eq!(totals.amount_excl_vat, dec!(10.83));
    assert_eq!(totals.vat.get(dec!(9)), dec!(0.97));
    assert_eq!(totals.vat.len(), 1);
    assert!(totals.is_consistent());

    assert_eq!(
        record.line_items,
        vec![
            LineItem::new("Koffie", dec!(2), dec!(3.50)),
            LineItem::new("Croissant", dec!(1), dec!(2.95)),
            LineItem::new("Appels", dec!(1), dec!(1.85)),
        ]
    );
    assert!(record.warnings.is_empty());
    assert_eq!(record.extraction_confidence, 0.95);
    assert_eq!(record.category, None);
    assert_eq!(record.conversion, None);
}

#[test]
fn mixed_rate_vat_table() {
    let text = "\
Jumbo Utrecht
Datum: 20-01-2025
Melk 1,19
Wasmiddel 12,10
BTW 9% 1,09 0,10 1,19
BTW 21% 10,00 2,10 12,10
Totaal 13,29";
    let record = extract(text, 1.0).unwrap();
    let totals = record.totals.unwrap();

    assert_eq!(totals.vat.get(dec!(9)), dec!(0.10));
    assert_eq!(totals.vat.get(dec!(21)), dec!(2.10));
    assert_eq!(totals.vat_total(), dec!(2.20));
    assert_eq!(totals.amount_excl_vat, dec!(11.09));
    assert_eq!(totals.total_incl_vat, dec!(13.29));
    assert!(totals.is_consistent());
}

#[test]
fn vat_table_with_base_on_some_rows_only() {
    let text = "\
Jumbo Utrecht
Datum: 20-01-2025
Melk 1,19
Wasmiddel 12,10
BTW 9% 1,09 0,10 1,19
BTW 21% 2,10
Totaal 13,29";
    let record = extract(text, 1.0).unwrap();
    let totals = record.totals.as_ref().unwrap();

    // a partial sum of bases is no excl. amount; derived from the total instead
    assert_eq!(totals.vat_total(), dec!(2.20));
    assert_eq!(totals.amount_excl_vat, dec!(11.09));
    assert!(totals.is_consistent());
    assert!(
        !record
            .warnings
            .iter()
            .any(|w| matches!(w, ExtractionWarning::InconsistentTotals { .. }))
    );
    assert_eq!(record.extraction_confidence, 1.0);
}

#[test]
fn vat_row_with_vat_and_inclusive_amount() {
    let text = "\
Jumbo Utrecht
Datum: 20-01-2025
Wasmiddel 12,10
BTW 21% 2,10 12,10
Totaal 12,10";
    let record = extract(text, 1.0).unwrap();
    let totals = record.totals.unwrap();

    assert_eq!(totals.vat.get(dec!(21)), dec!(2.10));
    assert_eq!(totals.amount_excl_vat, dec!(10.00));
    assert!(totals.is_consistent());
}

#[test]
fn vat_line_without_rate_uses_standard_rate() {
    let text = "\
Kiosk Centraal
Datum 10-03-2025
Krant 3,50
Totaal 3,50
BTW 0,61";
    let record = extract(text, 1.0).unwrap();
    let totals = record.totals.as_ref().unwrap();

    assert_eq!(totals.vat.get(dec!(21)), dec!(0.61));
    assert_eq!(totals.amount_excl_vat, dec!(2.89));
    assert!(record.has_warning(&ExtractionWarning::VatRateAssumed { rate: dec!(21) }));
    assert!((record.extraction_confidence - 0.95).abs() < 1e-9);
}

#[test]
fn custom_standard_rate() {
    let text = "Kiosk Centraal\nDatum 10-03-2025\nKrant 3,50\nTotaal 3,50\nBTW 0,29";
    let input = RawInput::new(text, 1.0, date(2025, 3, 31), MimeHint::Pdf).unwrap();
    let record = TextExtractor::default()
        .standard_vat_rate(dec!(9))
        .extract(&input)
        .unwrap();
    assert_eq!(record.totals.unwrap().vat.get(dec!(9)), dec!(0.29));
}

// ---------------------------------------------------------------------------
// Foreign receipts
// ---------------------------------------------------------------------------

#[test]
fn turkish_receipt() {
    let record = extract(MIGROS_TR, 0.9).unwrap();

    assert_eq!(record.language, "tr");
    assert_eq!(record.currency, "TRY");
    assert_eq!(record.vendor_name.as_deref(), Some("MIGROS TICARET AS"));
    assert_eq!(record.transaction_date, Some(date(2025, 1, 15)));
    assert_eq!(record.receipt_number.as_deref(), Some("0042"));

    let totals = record.totals.as_ref().unwrap();
    assert_eq!(totals.total_incl_vat, dec!(500.00));
    assert_eq!(totals.vat.get(dec!(20)), dec!(83.33));
    assert_eq!(totals.amount_excl_vat, dec!(416.67));

    assert_eq!(record.line_items.len(), 2);
    assert_eq!(record.line_items[0], LineItem::new("Ekmek", dec!(2), dec!(15.00)));
    assert_eq!(record.line_items[1].line_total(), dec!(470.00));
    assert_eq!(record.extraction_confidence, 0.9);
}

#[test]
fn english_receipt_with_pound_sign() {
    let record = extract(COFFEE_EN, 1.0).unwrap();

    assert_eq!(record.language, "en");
    // the printed marker beats the language default
    assert_eq!(record.currency, "GBP");
    assert_eq!(record.vendor_name.as_deref(), Some("Coffee Corner Ltd"));
    assert_eq!(record.transaction_date, Some(date(2024, 10, 3)));
    assert_eq!(record.receipt_number, None);

    let totals = record.totals.as_ref().unwrap();
    assert_eq!(totals.total_incl_vat, dec!(9.60));
    assert_eq!(totals.vat.get(dec!(20)), dec!(1.60));
    assert_eq!(totals.amount_excl_vat, dec!(8.00));
    assert_eq!(
        record.line_items[0],
        LineItem::new("Flat White", dec!(2), dec!(3.20))
    );
}

#[test]
fn language_default_currency_can_be_overridden() {
    let text = "Kahve Dunyasi\nKDV %10 1,00\nTOPLAM 11,00\nNAKIT 11,00";
    let currencies = CurrencyMap::default().with_override("tr", "USD").unwrap();
    let input = RawInput::new(text, 1.0, date(2025, 1, 15), MimeHint::Image).unwrap();

    let record = TextExtractor::new(currencies).extract(&input).unwrap();
    assert_eq!(record.language, "tr");
    assert_eq!(record.currency, "USD");
}

#[test]
fn dutch_receipt_ignores_foreign_marker() {
    let text = "\
Restaurant De Gouden Leeuw
Datum: 14-03-2025
2x Diner menu 76,00
BTW 9% 69,72 6,28 76,00
Totaal $ 76,00
PIN 76,00";
    let record = extract(text, 1.0).unwrap();

    assert_eq!(record.language, "nl");
    assert_eq!(record.currency, "EUR");
    assert_eq!(record.totals.as_ref().unwrap().total_incl_vat, dec!(76.00));
    assert!(record.has_warning(&ExtractionWarning::ForeignCurrencyIgnored {
        currency: "USD".into()
    }));
    assert!((record.extraction_confidence - 0.9).abs() < 1e-9);
}

#[test]
fn detects_language_of_fixtures() {
    assert_eq!(detect_language(SUPERMARKET_NL), Some("nl"));
    assert_eq!(detect_language(MIGROS_TR), Some("tr"));
    assert_eq!(detect_language(COFFEE_EN), Some("en"));
}

// ---------------------------------------------------------------------------
// Degraded input
// ---------------------------------------------------------------------------

#[test]
fn inconsistent_totals_are_kept_and_capped() {
    let text = "\
Bakkerij Jansen
Datum 02-02-2025
Brood 3,20
Taart 12,50
Totaal excl. BTW 14,00
BTW 9% 1,30
Totaal 17,00
Pinnen 17,00";
    let record = extract(text, 0.95).unwrap();
    let totals = record.totals.as_ref().unwrap();

    // as printed, not corrected
    assert_eq!(totals.amount_excl_vat, dec!(14.00));
    assert_eq!(totals.total_incl_vat, dec!(17.00));
    assert!(!totals.is_consistent());
    assert!(record.has_warning(&ExtractionWarning::InconsistentTotals {
        discrepancy: dec!(1.70)
    }));
    assert_eq!(record.extraction_confidence, INCONSISTENT_TOTALS_CAP);
}

#[test]
fn bare_receipt_collects_warnings() {
    let record = extract("Totaal 12,50", 1.0).unwrap();

    assert_eq!(record.language, UNDETERMINED_LANGUAGE);
    assert_eq!(record.currency, BASE_CURRENCY);
    assert_eq!(record.vendor_name, None);
    // falls back to the upload date
    assert_eq!(record.transaction_date, Some(date(2025, 3, 31)));
    for warning in [
        ExtractionWarning::UndeterminedLanguage,
        ExtractionWarning::NoVatBreakdown,
        ExtractionWarning::MissingVendor,
        ExtractionWarning::MissingDate,
        ExtractionWarning::NoLineItems,
    ] {
        assert!(record.has_warning(&warning), "missing {warning:?}");
    }
    assert!((record.extraction_confidence - 0.4).abs() < 1e-9);
}

#[test]
fn phone_number_is_not_a_date() {
    let text = "\
Bakkerij Jansen
Tel 06-12-34
Datum: 02-02-2025
Brood 3,20
BTW 9% 2,94 0,26 3,20
Totaal 3,20";
    let record = extract(text, 1.0).unwrap();
    assert_eq!(record.transaction_date, Some(date(2025, 2, 2)));
    assert!(!record.has_warning(&ExtractionWarning::MissingDate));
}

#[test]
fn total_from_currency_marker() {
    let record = extract("Souvenir Shop\nMagnet 4,00\n€ 4,00", 1.0).unwrap();
    assert_eq!(record.totals.as_ref().unwrap().total_incl_vat, dec!(4.00));
    assert_eq!(record.currency, "EUR");
    assert!(record.has_warning(&ExtractionWarning::TotalFromCurrencyMarker));
}

#[test]
fn no_total_is_unparseable() {
    let err = extract("Hallo wereld\nGeen bedragen hier", 1.0).unwrap_err();
    assert_eq!(err.stage, Stage::Extraction);
    assert_eq!(err.kind, ErrorKind::UnparseableReceipt);
    assert!(err.kind.is_fatal());
}

#[test]
fn source_confidence_bounds_the_result() {
    let record = extract(SUPERMARKET_NL, 0.3).unwrap();
    assert_eq!(record.extraction_confidence, 0.3);
}
