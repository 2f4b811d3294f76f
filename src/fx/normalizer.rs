use log::{debug, warn};
use rust_decimal::Decimal;

use super::error::RateError;
use super::gateway::{ExchangeRateGateway, RateLookup};
use super::provider::RateProvider;
use crate::core::{
    BASE_CURRENCY, ConversionMetadata, LineItem, StructuredRecord, Totals, round_money,
};

/// Result of normalizing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalization {
    /// Amounts are in EUR. For a foreign record the conversion audit
    /// trail is attached.
    Converted(StructuredRecord),
    /// No rate could be resolved. The record keeps its original amounts
    /// and carries conversion metadata without a rate source.
    Unresolved {
        record: StructuredRecord,
        error: RateError,
    },
}

impl Normalization {
    pub fn record(&self) -> &StructuredRecord {
        match self {
            Self::Converted(record) | Self::Unresolved { record, .. } => record,
        }
    }

    pub fn into_record(self) -> StructuredRecord {
        match self {
            Self::Converted(record) | Self::Unresolved { record, .. } => record,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Converted(_))
    }
}

/// Converts foreign-currency records into EUR through the rate gateway.
pub struct CurrencyNormalizer<P> {
    gateway: ExchangeRateGateway<P>,
}

impl<P: RateProvider> CurrencyNormalizer<P> {
    pub fn new(gateway: ExchangeRateGateway<P>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &ExchangeRateGateway<P> {
        &self.gateway
    }

    /// Convert `record` into EUR at the rate of its transaction date.
    ///
    /// EUR records are returned untouched.
    pub async fn normalize(&self, record: StructuredRecord) -> Normalization {
        if record.is_base_currency() {
            return Normalization::Converted(record);
        }
        let date = record
            .transaction_date
            .unwrap_or_else(|| self.gateway.clock().today());

        let Some(totals) = record.totals.clone() else {
            let error = RateError::Unavailable {
                pair: format!("{}/{BASE_CURRENCY}", record.currency),
                date,
                reason: "record has no totals to convert".into(),
            };
            return Normalization::Unresolved { record, error };
        };

        match self.gateway.rate(&record.currency, BASE_CURRENCY, date).await {
            Ok(lookup) => {
                debug!(
                    "converting {} {} at {} ({})",
                    totals.total_incl_vat, record.currency, lookup.rate, lookup.source
                );
                Normalization::Converted(convert(record, totals, lookup))
            }
            Err(error) => {
                warn!("currency conversion unresolved for {}: {error}", record.currency);
                let mut record = record;
                record.conversion = Some(ConversionMetadata::unresolved(record.currency.clone(), totals));
                Normalization::Unresolved { record, error }
            }
        }
    }
}

/// Multiply every monetary field by the rate, rounding each one on its own.
///
/// If independent rounding breaks `total = excl + Σ vat`, the excl. amount
/// is recomputed from the converted total and VAT.
fn convert(mut record: StructuredRecord, original: Totals, lookup: RateLookup) -> StructuredRecord {
    let rate = lookup.rate;
    let at_rate = |amount: Decimal| round_money(amount * rate);

    let vat = original.vat.map_amounts(at_rate);
    let total = at_rate(original.total_incl_vat);
    let mut converted = Totals::new(at_rate(original.amount_excl_vat), vat, total);
    if !converted.is_consistent() {
        converted.amount_excl_vat = converted.total_incl_vat - converted.vat_total();
    }

    record.line_items = record
        .line_items
        .into_iter()
        .map(|item| LineItem {
            unit_amount: at_rate(item.unit_amount),
            ..item
        })
        .collect();

    let original_currency = std::mem::replace(&mut record.currency, BASE_CURRENCY.to_string());
    record.conversion = Some(ConversionMetadata::converted(
        original_currency,
        original,
        rate,
        lookup.rate_date,
        lookup.source,
    ));
    record.totals = Some(converted);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RateSource, VatBuckets};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn lookup(rate: Decimal) -> RateLookup {
        RateLookup {
            rate,
            rate_date: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            source: RateSource::Live,
        }
    }

    fn record(currency: &str, totals: Totals) -> StructuredRecord {
        StructuredRecord {
            currency: currency.into(),
            totals: Some(totals),
            ..StructuredRecord::default()
        }
    }

    #[test]
    fn converts_lira_receipt() {
        let vat: VatBuckets = [(dec!(20), dec!(83.33))].into_iter().collect();
        let totals = Totals::new(dec!(416.67), vat, dec!(500.00));
        let out = convert(record("TRY", totals.clone()), totals.clone(), lookup(dec!(0.028)));

        let t = out.totals.as_ref().unwrap();
        assert_eq!(t.total_incl_vat, dec!(14.00));
        assert_eq!(t.vat.get(dec!(20)), dec!(2.33));
        assert_eq!(t.amount_excl_vat, dec!(11.67));
        assert_eq!(out.currency, "EUR");

        let meta = out.conversion.as_ref().unwrap();
        assert_eq!(meta.original_currency(), "TRY");
        assert_eq!(meta.original_amounts(), &totals);
        assert_eq!(meta.rate_source(), Some(RateSource::Live));
    }

    #[test]
    fn recomputes_excl_when_rounding_drifts() {
        // every field lands on x.xx5 and rounds down to even on its own
        let vat: VatBuckets = [
            (dec!(0), dec!(0.25)),
            (dec!(9), dec!(0.25)),
            (dec!(21), dec!(0.25)),
        ]
        .into_iter()
        .collect();
        let totals = Totals::new(dec!(0.25), vat, dec!(1.00));
        let out = convert(record("USD", totals.clone()), totals, lookup(dec!(0.1)));

        let t = out.totals.unwrap();
        assert_eq!(t.total_incl_vat, dec!(0.10));
        assert_eq!(t.vat_total(), dec!(0.06));
        assert_eq!(t.amount_excl_vat, dec!(0.04));
        assert!(t.is_consistent());
    }
}
