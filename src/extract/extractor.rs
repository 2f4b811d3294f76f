use std::sync::LazyLock;

use chrono::NaiveDate;
use log::{debug, warn};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::amounts::{amounts_in, last_amount, parse_amount, percent_in};
use super::language::{detect_language, tokens};
use crate::core::{
    BASE_CURRENCY, ErrorKind, ExtractionWarning, HOME_LANGUAGE, LineItem, PipelineError, RawInput, Stage,
    StructuredRecord, TOTALS_EPSILON, Totals, UNDETERMINED_LANGUAGE, VatBuckets,
    currency_for_marker, is_currency_symbol, known_currency_code,
};
use crate::fx::CurrencyMap;

/// Confidence ceiling for receipts whose printed totals do not add up.
pub const INCONSISTENT_TOTALS_CAP: f64 = 0.5;

/// Turns acquired receipt text into a [`StructuredRecord`].
pub trait Extractor: Send + Sync {
    /// # Errors
    ///
    /// `UnparseableReceipt` when the text has no monetary total.
    fn extract(&self, input: &RawInput) -> Result<StructuredRecord, PipelineError>;
}

/// Rule-based extractor for printed receipts.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    currencies: CurrencyMap,
    standard_vat_rate: Decimal,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(CurrencyMap::default())
    }
}

impl TextExtractor {
    pub fn new(currencies: CurrencyMap) -> Self {
        Self {
            currencies,
            standard_vat_rate: dec!(21),
        }
    }

    /// Rate used for VAT lines that print no percentage (default 21).
    pub fn standard_vat_rate(mut self, rate: Decimal) -> Self {
        self.standard_vat_rate = rate;
        self
    }
}

impl Extractor for TextExtractor {
    fn extract(&self, input: &RawInput) -> Result<StructuredRecord, PipelineError> {
        let lines: Vec<Line<'_>> = input
            .text()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(Line::classify)
            .collect();

        let mut warnings = Vec::new();
        let mut record = StructuredRecord::default();

        record.language = detect_language(input.text())
            .unwrap_or(UNDETERMINED_LANGUAGE)
            .to_string();

        record.currency = match explicit_currency(input.text()) {
            Some(code) => code.to_string(),
            None => match self.currencies.currency_for(&record.language) {
                Some(code) => code.to_string(),
                None => {
                    warnings.push(ExtractionWarning::UndeterminedLanguage);
                    BASE_CURRENCY.to_string()
                }
            },
        };
        if record.language == HOME_LANGUAGE && record.currency != BASE_CURRENCY {
            debug!("ignoring {} marker on a Dutch receipt", record.currency);
            warnings.push(ExtractionWarning::ForeignCurrencyIgnored {
                currency: std::mem::replace(&mut record.currency, BASE_CURRENCY.to_string()),
            });
        }

        let (total, from_marker) = find_total(&lines).ok_or_else(|| {
            PipelineError::new(
                Stage::Extraction,
                ErrorKind::UnparseableReceipt,
                "no monetary total found in receipt text",
            )
        })?;
        if from_marker {
            warnings.push(ExtractionWarning::TotalFromCurrencyMarker);
        }

        let vat = self.find_vat(&lines, &mut warnings);
        if vat.buckets.is_empty() {
            warnings.push(ExtractionWarning::NoVatBreakdown);
        }

        let printed_excl = lines
            .iter()
            .filter(|l| l.kind == LineKind::ExclVat)
            .filter_map(|l| last_amount(l.text))
            .last()
            .or(vat.bases);
        let totals = match printed_excl {
            Some(excl) => Totals::new(excl, vat.buckets, total),
            None => {
                let excl = total - vat.buckets.total();
                Totals::new(excl, vat.buckets, total)
            }
        };
        let consistent = totals.is_consistent();
        if !consistent {
            warn!(
                "receipt totals do not add up: {} + {} != {}",
                totals.amount_excl_vat,
                totals.vat_total(),
                totals.total_incl_vat
            );
            warnings.push(ExtractionWarning::InconsistentTotals {
                discrepancy: totals.discrepancy(),
            });
        }
        record.totals = Some(totals);

        record.vendor_name = find_vendor(&lines);
        if record.vendor_name.is_none() {
            warnings.push(ExtractionWarning::MissingVendor);
        }

        record.transaction_date = lines
            .iter()
            .filter(|l| !is_contact_line(l.text))
            .find_map(|l| find_date(l.text));
        if record.transaction_date.is_none() {
            record.transaction_date = Some(input.receipt_date());
            warnings.push(ExtractionWarning::MissingDate);
        }

        record.receipt_number = lines
            .iter()
            .filter(|l| l.kind == LineKind::Other)
            .find_map(|l| find_receipt_number(l.text));

        record.line_items = lines
            .iter()
            .skip(1)
            .filter(|l| l.kind == LineKind::Other)
            .filter_map(|l| parse_line_item(l.text))
            .collect();
        if record.line_items.is_empty() {
            warnings.push(ExtractionWarning::NoLineItems);
        }

        let score = 1.0 - warnings.iter().map(penalty).sum::<f64>();
        let mut confidence = score.clamp(0.0, 1.0).min(input.source_confidence());
        if !consistent {
            confidence = confidence.min(INCONSISTENT_TOTALS_CAP);
        }
        record.extraction_confidence = confidence;
        record.warnings = warnings;

        debug!(
            "extracted receipt: vendor={:?} language={} currency={} confidence={:.2}",
            record.vendor_name, record.language, record.currency, record.extraction_confidence
        );
        Ok(record)
    }
}

fn penalty(warning: &ExtractionWarning) -> f64 {
    match warning {
        ExtractionWarning::InconsistentTotals { .. } => 0.0,
        ExtractionWarning::MissingVendor
        | ExtractionWarning::MissingDate
        | ExtractionWarning::NoLineItems
        | ExtractionWarning::NoVatBreakdown
        | ExtractionWarning::ForeignCurrencyIgnored { .. } => 0.10,
        ExtractionWarning::VatRateAssumed { .. } => 0.05,
        ExtractionWarning::UndeterminedLanguage | ExtractionWarning::TotalFromCurrencyMarker => 0.20,
    }
}

// ── Line classification ─────────────────────────────────────────────────────

const TOTAL_KEYWORDS: &[&str] = &[
    "totaal", "total", "te betalen", "toplam", "summe", "gesamt", "razem", "suma", "à payer",
    "a pagar", "amount due", "balance due",
];

const SUBTOTAL_KEYWORDS: &[&str] = &[
    "subtotaal", "subtotal", "sub-total", "sub total", "zwischensumme", "ara toplam", "subtotale",
];

const EXCL_KEYWORDS: &[&str] = &[
    "excl", "exkl", "exclusief", "ex btw", "ex. btw", "netto", "net amount", "hors taxe",
    "matrah", "imponibile", "base imponible",
];

const INCL_KEYWORDS: &[&str] = &["incl", "inkl", "inclusief", "ttc", "dahil"];

const VAT_WORDS: &[&str] = &["btw", "vat", "kdv", "mwst", "ust", "tva", "iva", "ptu", "tax"];

/// Words that turn a VAT line into a registration-number line.
const ID_WORDS: &[&str] = &["nr", "no", "nummer", "number", "reg", "id", "vkn", "steuernr"];

const PAYMENT_WORDS: &[&str] = &[
    "pin", "pinnen", "contant", "cash", "card", "kaart", "visa", "mastercard", "maestro",
    "wisselgeld", "change", "retour", "betaald", "paid", "nakit", "kredi", "tip", "fooi",
    "gegeben", "rückgeld", "espèces", "efectivo", "contanti", "gotówka",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Total,
    Subtotal,
    ExclVat,
    Vat,
    Payment,
    Other,
}

struct Line<'a> {
    text: &'a str,
    kind: LineKind,
}

impl<'a> Line<'a> {
    fn classify(text: &'a str) -> Self {
        let lower = text.to_lowercase();
        let words = tokens(text);
        let has = |list: &[&str]| list.iter().any(|k| lower.contains(k));
        let has_word = |list: &[&str]| list.iter().any(|k| words.contains(*k));

        let kind = if has(SUBTOTAL_KEYWORDS) {
            LineKind::Subtotal
        } else if has(EXCL_KEYWORDS) && !has(INCL_KEYWORDS) {
            LineKind::ExclVat
        } else if has(TOTAL_KEYWORDS) && (!has_word(VAT_WORDS) || has(INCL_KEYWORDS)) {
            LineKind::Total
        } else if has_word(VAT_WORDS) && !has_word(ID_WORDS) {
            LineKind::Vat
        } else if has_word(PAYMENT_WORDS) {
            LineKind::Payment
        } else {
            LineKind::Other
        };
        Self { text, kind }
    }
}

// ── Totals ──────────────────────────────────────────────────────────────────

/// Last total line wins; without one, the last amount printed next to a
/// currency marker. The flag tells which rule was used.
fn find_total(lines: &[Line<'_>]) -> Option<(Decimal, bool)> {
    let keyword_total = lines
        .iter()
        .filter(|l| l.kind == LineKind::Total)
        .filter_map(|l| last_amount(l.text))
        .last();
    if let Some(total) = keyword_total {
        return Some((total, false));
    }

    lines
        .iter()
        .filter(|l| l.kind != LineKind::Vat && !currency_markers(l.text).is_empty())
        .filter_map(|l| last_amount(l.text))
        .last()
        .map(|total| (total, true))
}

struct VatScan {
    buckets: VatBuckets,
    /// Sum of taxable bases, set only when every rated row printed one.
    bases: Option<Decimal>,
}

impl TextExtractor {
    /// Lines with a percentage fill buckets by rate. Percentage-less VAT
    /// lines are summaries; they are only used when nothing else is
    /// printed, booked under the standard rate.
    fn find_vat(&self, lines: &[Line<'_>], warnings: &mut Vec<ExtractionWarning>) -> VatScan {
        let mut buckets = VatBuckets::new();
        let mut bases = Decimal::ZERO;
        let mut every_row_based = true;
        let mut unrated: Option<Decimal> = None;

        for line in lines.iter().filter(|l| l.kind == LineKind::Vat) {
            let amounts = amounts_in(line.text);
            let Some(&last) = amounts.last() else {
                continue;
            };
            let Some(rate) = percent_in(line.text) else {
                unrated = Some(last);
                continue;
            };

            let (base, vat) = split_vat_row(&amounts, rate);
            buckets.add(rate, vat);
            match base {
                Some(base) => bases += base,
                None => every_row_based = false,
            }
        }
        let bases = (every_row_based && !buckets.is_empty()).then_some(bases);

        if buckets.is_empty() {
            if let Some(amount) = unrated {
                buckets.add(self.standard_vat_rate, amount);
                warnings.push(ExtractionWarning::VatRateAssumed {
                    rate: self.standard_vat_rate,
                });
            }
        }
        VatScan { buckets, bases }
    }
}

/// Interpret the amounts on a VAT row as `(taxable base, vat)`.
///
/// Table rows print `base vat incl`, `base vat` or `vat incl`. A row
/// that fits none of these yields its smallest amount as VAT.
fn split_vat_row(amounts: &[Decimal], rate: Decimal) -> (Option<Decimal>, Decimal) {
    let tolerance = dec!(0.02);
    let vat_in_incl = |incl: Decimal| incl * rate / (dec!(100) + rate);
    match amounts {
        [.., base, vat, incl] if (*base + *vat - *incl).abs() <= TOTALS_EPSILON => (Some(*base), *vat),
        [.., base, vat] if (*base * rate / dec!(100) - *vat).abs() <= tolerance => (Some(*base), *vat),
        [.., vat, incl] if (vat_in_incl(*incl) - *vat).abs() <= tolerance => (Some(*incl - *vat), *vat),
        [vat] => (None, *vat),
        _ => {
            let vat = amounts
                .iter()
                .copied()
                .filter(|a| !a.is_sign_negative())
                .min()
                .unwrap_or(Decimal::ZERO);
            (None, vat)
        }
    }
}

/// Currency codes named by the markers in one line, in order of appearance.
fn currency_markers(line: &str) -> Vec<&'static str> {
    let mut found = Vec::new();
    for token in line.split(|c: char| c.is_whitespace() || (c.is_ascii_punctuation() && c != '$')) {
        found.extend(
            token
                .chars()
                .filter(|c| is_currency_symbol(*c))
                .filter_map(|c| currency_for_marker(c.encode_utf8(&mut [0; 4]))),
        );
        let word: String = token.chars().filter(|c| c.is_alphabetic()).collect();
        if word.len() == 3 && word.chars().all(|c| c.is_ascii_uppercase()) {
            if let Some(code) = known_currency_code(&word) {
                found.push(code);
                continue;
            }
        }
        // abbreviations only count as whole tokens: "TL", not "TLC"
        if !word.is_empty() && word.chars().count() == token.chars().count() {
            found.extend(currency_for_marker(&word));
        }
    }
    found
}

/// Most frequent currency marker in the text; ties go to the first seen.
fn explicit_currency(text: &str) -> Option<&'static str> {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for code in text.lines().flat_map(currency_markers) {
        match counts.iter_mut().find(|(c, _)| *c == code) {
            Some((_, n)) => *n += 1,
            None => counts.push((code, 1)),
        }
    }

    counts
        .into_iter()
        .fold(None::<(&'static str, usize)>, |best, (code, n)| match best {
            Some((_, top)) if top >= n => best,
            _ => Some((code, n)),
        })
        .map(|(code, _)| code)
}

// ── Header fields ───────────────────────────────────────────────────────────

static YMD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").expect("date pattern is valid")
});

static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[-/.](\d{1,2})[-/.](\d{4}|\d{2})\b").expect("date pattern is valid")
});

static NAMED_MONTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})\.?\s+(\p{L}{3,9})\.?\s+(\d{4})\b").expect("date pattern is valid")
});

static RECEIPT_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:bonnummer|bonnr|bon|factuurnummer|factuur|invoice|receipt|fiş no|fis no|nummer|nr|no)\.?\s*[:#]?\s*([A-Z0-9][A-Z0-9/-]{2,})",
    )
    .expect("receipt number pattern is valid")
});

/// Month-name prefixes in Dutch, English, German, French and Turkish.
/// Checked in order, so `juil` must precede `jui`.
const MONTHS: &[(&str, u32)] = &[
    ("jan", 1), ("oca", 1), ("feb", 2), ("şub", 2), ("fév", 2), ("fev", 2), ("mrt", 3),
    ("maa", 3), ("mar", 3), ("mär", 3), ("apr", 4), ("avr", 4), ("nis", 4), ("mei", 5),
    ("may", 5), ("mai", 5), ("juil", 7), ("jun", 6), ("jui", 6), ("haz", 6), ("jul", 7),
    ("tem", 7), ("aug", 8), ("aoû", 8), ("ağu", 8), ("sep", 9), ("eyl", 9), ("okt", 10),
    ("oct", 10), ("eki", 10), ("nov", 11), ("kas", 11), ("dec", 12), ("dez", 12), ("déc", 12),
    ("ara", 12),
];

const CONTACT_WORDS: &[&str] = &[
    "tel", "telefoon", "telefon", "phone", "fax", "gsm", "mobiel", "mobile", "whatsapp",
];

/// Phone and fax lines print digit groups that read as dates.
fn is_contact_line(line: &str) -> bool {
    let words = tokens(line);
    CONTACT_WORDS.iter().any(|w| words.contains(*w))
}

/// First calendar date printed on the line.
fn find_date(line: &str) -> Option<NaiveDate> {
    if let Some(caps) = YMD_RE.captures(line) {
        let (y, m, d) = (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
            return Some(date);
        }
    }
    if let Some(caps) = DMY_RE.captures(line) {
        let d: u32 = caps[1].parse().ok()?;
        let m: u32 = caps[2].parse().ok()?;
        let y: i32 = caps[3].parse().ok()?;
        let y = if caps[3].len() == 2 { 2000 + y } else { y };
        // day-first, then month-first for US-style receipts
        if let Some(date) = NaiveDate::from_ymd_opt(y, m, d).or_else(|| NaiveDate::from_ymd_opt(y, d, m)) {
            return Some(date);
        }
    }
    let caps = NAMED_MONTH_RE.captures(line)?;
    let day: u32 = caps[1].parse().ok()?;
    let name = caps[2].to_lowercase();
    let month = MONTHS
        .iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map(|(_, m)| *m)?;
    NaiveDate::from_ymd_opt(caps[3].parse().ok()?, month, day)
}

/// First of the top five lines that reads like a name.
fn find_vendor(lines: &[Line<'_>]) -> Option<String> {
    lines.iter().take(5).find_map(|line| {
        if line.kind != LineKind::Other || find_date(line.text).is_some() {
            return None;
        }
        let cleaned: String = line
            .text
            .chars()
            .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '&' | '-' | '\''))
            .collect();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        let has_letters = cleaned.chars().filter(|c| c.is_alphabetic()).count() >= 3;
        has_letters.then_some(cleaned)
    })
}

fn find_receipt_number(line: &str) -> Option<String> {
    let caps = RECEIPT_NUMBER_RE.captures(line)?;
    let number = caps.get(1)?.as_str();
    number
        .chars()
        .any(|c| c.is_ascii_digit())
        .then(|| number.to_string())
}

// ── Line items ──────────────────────────────────────────────────────────────

const ITEM_AMOUNT: &str = r"-?\d{1,3}(?:[.,]\d{3})*[.,]\d{2}|-?\d+[.,]\d{2}";

/// `Koffie 2 x 3,50 7,00`
static QTY_TIMES_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<desc>.*?[^\d\s].*?)\s+(?P<qty>\d+(?:[.,]\d+)?)\s*[xX×*]\s*[€$£₺]?\s*(?P<unit>{ITEM_AMOUNT})(?:\s+[€$£₺]?\s*(?:{ITEM_AMOUNT}))?(?:\s+[A-Z])?$"
    ))
    .expect("line item pattern is valid")
});

/// `2x Koffie 7,00`
static QTY_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<qty>\d+)\s*[xX×*]\s+(?P<desc>.+?)\s+[€$£₺]?\s*(?P<amount>{ITEM_AMOUNT})(?:\s+[A-Z])?$"
    ))
    .expect("line item pattern is valid")
});

/// `Croissant 2,95`
static SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<desc>.*?[[:alpha:]].*?)\s+[€$£₺*]?\s*(?P<amount>{ITEM_AMOUNT})(?:\s+[A-Z])?$"
    ))
    .expect("line item pattern is valid")
});

fn parse_line_item(line: &str) -> Option<LineItem> {
    if find_date(line).is_some() {
        return None;
    }
    if let Some(caps) = QTY_TIMES_UNIT_RE.captures(line) {
        let qty = parse_amount(&caps["qty"])?;
        let unit = parse_amount(&caps["unit"])?;
        return Some(LineItem::new(clean_description(&caps["desc"]), qty, unit));
    }
    if let Some(caps) = QTY_PREFIX_RE.captures(line) {
        let qty = parse_amount(&caps["qty"])?;
        let amount = parse_amount(&caps["amount"])?;
        if qty.is_zero() {
            return None;
        }
        return Some(LineItem::new(clean_description(&caps["desc"]), qty, amount / qty));
    }
    let caps = SINGLE_RE.captures(line)?;
    let amount = parse_amount(&caps["amount"])?;
    Some(LineItem::new(clean_description(&caps["desc"]), Decimal::ONE, amount))
}

fn clean_description(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| is_currency_symbol(c) || c == '*' || c.is_whitespace())
        .to_string()
}
