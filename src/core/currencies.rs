//! ISO 4217 currency codes and the printed markers that identify them
//! on receipts.

/// Check whether `code` is a known ISO 4217 currency code.
pub fn is_known_currency_code(code: &str) -> bool {
    CURRENCY_CODES.binary_search(&code).is_ok()
}

/// The static copy of a known code, for callers that keep it.
pub(crate) fn known_currency_code(code: &str) -> Option<&'static str> {
    CURRENCY_CODES
        .binary_search(&code)
        .ok()
        .map(|i| CURRENCY_CODES[i])
}

/// Map a printed currency marker (symbol or local abbreviation) to its
/// ISO 4217 code. Case-sensitive: `TL` is a currency, `tl` is not.
pub fn currency_for_marker(marker: &str) -> Option<&'static str> {
    let marker = marker.trim();
    CURRENCY_MARKERS
        .iter()
        .find(|(m, _)| *m == marker)
        .map(|(_, code)| *code)
}

/// Whether `c` is a currency symbol listed in the marker table.
pub(crate) fn is_currency_symbol(c: char) -> bool {
    CURRENCY_MARKERS.iter().any(|(m, _)| {
        let mut chars = m.chars();
        chars.next() == Some(c) && chars.next().is_none()
    })
}

/// Symbols and abbreviations printed on receipts. ISO codes themselves
/// are matched separately against [`CURRENCY_CODES`].
static CURRENCY_MARKERS: &[(&str, &str)] = &[
    ("€", "EUR"),
    ("$", "USD"),
    ("£", "GBP"),
    ("₺", "TRY"),
    ("¥", "JPY"),
    ("₩", "KRW"),
    ("₽", "RUB"),
    ("₴", "UAH"),
    ("TL", "TRY"),
    ("zł", "PLN"),
    ("Kč", "CZK"),
    ("Ft", "HUF"),
    ("LEI", "RON"),
];

/// Sorted for binary search.
static CURRENCY_CODES: &[&str] = &[
    "AED", "AUD", "BGN", "BRL", "CAD", "CHF", "CNY", "CZK", "DKK", "EUR", "GBP", "HKD", "HUF",
    "IDR", "ILS", "INR", "ISK", "JPY", "KRW", "MAD", "MXN", "MYR", "NOK", "NZD", "PHP", "PLN",
    "RON", "RSD", "RUB", "SEK", "SGD", "THB", "TRY", "UAH", "USD", "ZAR",
];
