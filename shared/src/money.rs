//! Monetary arithmetic helpers
//!
//! All monetary values in the system are `rust_decimal::Decimal`.
//! Calculations stay in `Decimal` end to end; rounding happens once,
//! through [`round_money`], whenever a derived amount is produced.

use rust_decimal::prelude::*;

/// Rounding precision for monetary values (2 decimal places, half-up)
pub const DECIMAL_PLACES: u32 = 2;

/// Round a monetary value to 2 decimal places, midpoint away from zero
#[inline]
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// `percentage` percent of `amount`, rounded to money precision.
///
/// `percentage` is expressed as a whole number (30 = 30%).
#[inline]
pub fn percent_of(amount: Decimal, percentage: Decimal) -> Decimal {
    round_money(amount * percentage / Decimal::ONE_HUNDRED)
}

/// Construct a Decimal from integer cents (test and fixture helper)
#[inline]
pub fn cents(value: i64) -> Decimal {
    Decimal::new(value, DECIMAL_PLACES)
}
