//! Locale-tolerant parsing of printed amounts and VAT percentages.
//!
//! Receipts mix `12,50` (Dutch, German, Turkish) with `12.50` (English)
//! and both thousands styles (`1.234,56`, `1,234.56`).

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|-?\d+(?:[.,]\d{1,2})?")
        .expect("amount pattern is valid")
});

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}(?:[.,]\d{1,2})?)\s*%|%\s*(\d{1,2}(?:[.,]\d{1,2})?)")
        .expect("percent pattern is valid")
});

/// Longer digit runs are account or card numbers, not amounts.
const MAX_AMOUNT_LEN: usize = 20;

/// Parse one printed amount such as `1.234,56`, `1,234.56`, `12,5` or `-3.00`.
///
/// A lone separator followed by exactly three digits is read as a
/// thousands separator.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, raw),
    };
    if digits.is_empty()
        || digits.len() > MAX_AMOUNT_LEN
        || !digits.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    let last_dot = digits.rfind('.');
    let last_comma = digits.rfind(',');
    let decimal_sep = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (Some(i), None) | (None, Some(i)) => {
            let sep = digits[i..].chars().next()?;
            let fraction_len = digits.len() - i - 1;
            let occurrences = digits.matches(sep).count();
            (occurrences == 1 && fraction_len != 3).then_some(sep)
        }
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(digits.len() + 1);
    if negative {
        normalized.push('-');
    }
    for c in digits.chars() {
        match c {
            '0'..='9' => normalized.push(c),
            c if Some(c) == decimal_sep => normalized.push('.'),
            _ => {}
        }
    }
    Decimal::from_str(&normalized).ok()
}

/// All standalone amounts on a line, left to right.
///
/// Numbers glued to letters (`NL123B01`), part of a date or time
/// (`15-01-2025`, `12:30`) or followed by `%` are skipped.
pub fn amounts_in(line: &str) -> Vec<Decimal> {
    AMOUNT_RE
        .find_iter(line)
        .filter(|m| is_standalone(line, m.start(), m.end()))
        .filter_map(|m| parse_amount(m.as_str()))
        .collect()
}

pub fn last_amount(line: &str) -> Option<Decimal> {
    amounts_in(line).pop()
}

/// First VAT percentage printed on the line (`21%`, `%20`, `9,0 %`).
pub fn percent_in(line: &str) -> Option<Decimal> {
    let caps = PERCENT_RE.captures(line)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?;
    parse_amount(raw.as_str())
}

fn is_standalone(line: &str, start: usize, end: usize) -> bool {
    let before = line[..start].chars().next_back();
    let mut after = line[end..].chars();
    let next = after.next();
    let next_next = after.next();

    let bad_before = before.is_some_and(|c| c.is_alphanumeric() || matches!(c, '.' | ',' | '/' | ':' | '%' | '-'));
    let bad_after = match next {
        Some(c) if c.is_alphanumeric() || matches!(c, '%' | '/' | ':' | '-') => true,
        Some('.' | ',') => next_next.is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    };
    !bad_before && !bad_after
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_decimal_styles() {
        assert_eq!(parse_amount("12,50"), Some(dec!(12.50)));
        assert_eq!(parse_amount("12.50"), Some(dec!(12.50)));
        assert_eq!(parse_amount("1.234,56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("1.234"), Some(dec!(1234)));
        assert_eq!(parse_amount("12,5"), Some(dec!(12.5)));
        assert_eq!(parse_amount("-3,00"), Some(dec!(-3.00)));
        assert_eq!(parse_amount("500"), Some(dec!(500)));
        assert_eq!(parse_amount("12a"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn skips_dates_times_and_ids() {
        assert_eq!(amounts_in("15-01-2025 12:30"), vec![]);
        assert_eq!(amounts_in("15.01.2025"), vec![]);
        assert_eq!(amounts_in("BTW NL123456789B01"), vec![]);
        assert_eq!(amounts_in("BTW 21% 2,10"), vec![dec!(2.10)]);
        assert_eq!(amounts_in("KDV %20 83,33"), vec![dec!(83.33)]);
    }

    #[test]
    fn finds_amounts_next_to_symbols() {
        assert_eq!(amounts_in("Totaal €12,50"), vec![dec!(12.50)]);
        assert_eq!(amounts_in("TOPLAM *500,00 TL"), vec![dec!(500.00)]);
        assert_eq!(amounts_in("Korting -1,00"), vec![dec!(-1.00)]);
        assert_eq!(last_amount("Koffie 2 x 3,50 7,00"), Some(dec!(7.00)));
    }

    #[test]
    fn percentages() {
        assert_eq!(percent_in("BTW 21% 2,10"), Some(dec!(21)));
        assert_eq!(percent_in("KDV %20 83,33"), Some(dec!(20)));
        assert_eq!(percent_in("BTW laag 9,0 % 0,45"), Some(dec!(9.0)));
        assert_eq!(percent_in("BTW 2,10"), None);
    }
}
