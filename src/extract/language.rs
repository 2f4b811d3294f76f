//! Keyword-based receipt language detection.

use std::collections::HashSet;

/// A language needs at least this many distinct indicator hits.
pub const MIN_INDICATORS: usize = 2;

/// Indicator words per language, in tie-break order (Dutch first).
/// Entries containing a space are matched as phrases.
static INDICATORS: &[(&str, &[&str])] = &[
    (
        "nl",
        &[
            "btw", "totaal", "bedrag", "datum", "bon", "kassabon", "inclusief", "exclusief",
            "aantal", "prijs", "korting", "subtotaal", "te betalen", "contant", "pinnen",
            "retour", "wisselgeld", "bedankt", "tot ziens", "betaald",
        ],
    ),
    (
        "en",
        &[
            "total", "subtotal", "vat", "tax", "amount", "receipt", "change", "cash", "card",
            "thank you", "qty", "price", "invoice", "paid", "balance due",
        ],
    ),
    (
        "de",
        &[
            "mwst", "ust", "summe", "gesamt", "betrag", "rechnung", "bar", "netto", "brutto",
            "danke", "kasse", "zwischensumme", "quittung", "gegeben",
        ],
    ),
    (
        "fr",
        &[
            "tva", "ttc", "ht", "montant", "merci", "facture", "espèces", "carte", "ticket",
            "à payer", "rendu",
        ],
    ),
    (
        "tr",
        &[
            "kdv", "toplam", "tutar", "tarih", "fiş", "fis", "nakit", "kredi", "kartı",
            "teşekkür", "ederiz", "adet", "matrah", "ara toplam",
        ],
    ),
    (
        "es",
        &[
            "iva", "importe", "fecha", "gracias", "factura", "efectivo", "tarjeta", "cambio",
            "base imponible",
        ],
    ),
    (
        "it",
        &[
            "iva", "totale", "importo", "grazie", "scontrino", "contanti", "resto",
            "imponibile", "documento commerciale",
        ],
    ),
    (
        "pl",
        &[
            "ptu", "suma", "razem", "paragon", "gotówka", "dziękujemy", "sprzedaż", "fiskalny",
        ],
    ),
];

/// Lower-case word tokens of `text`.
pub(crate) fn tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Detect the dominant language of the receipt text.
///
/// Returns the ISO 639-1 code with the most distinct indicator hits, or
/// `None` when no language reaches [`MIN_INDICATORS`].
pub fn detect_language(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let words = tokens(text);

    let mut best: Option<(&'static str, usize)> = None;
    for (code, indicators) in INDICATORS {
        let hits = indicators
            .iter()
            .filter(|w| {
                if w.contains(' ') {
                    lower.contains(*w)
                } else {
                    words.contains(**w)
                }
            })
            .count();
        if hits >= MIN_INDICATORS && best.is_none_or(|(_, top)| hits > top) {
            best = Some((code, hits));
        }
    }
    best.map(|(code, _)| code)
}
