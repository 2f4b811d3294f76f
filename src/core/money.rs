use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

/// Decimal places kept on every monetary output field.
pub const MONEY_DP: u32 = 2;

/// Tolerance for `total_incl_vat == amount_excl_vat + Σ vat`.
pub const TOTALS_EPSILON: Decimal = dec!(0.01);

/// Round to cents, half-to-even.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointNearestEven)
}

/// Apply a percentage (0–100) to an amount without rounding.
pub fn percent_of(amount: Decimal, pct: Decimal) -> Decimal {
    amount * pct / dec!(100)
}
