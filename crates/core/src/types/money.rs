//! Money representation using decimal arithmetic.
//!
//! Amounts are kept as [`Decimal`] in the currency's standard unit (euros,
//! not cents). Anything computed and shown to a shopper goes through
//! [`round_money`] first.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places for monetary amounts.
const MONEY_DECIMAL_PLACES: u32 = 2;

/// Round an amount to cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}
