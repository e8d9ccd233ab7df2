//! Discount Rules Engine
//!
//! Pure evaluation of promotional rules against a cart snapshot
//! ([`validator`], [`calculator`]) plus the usage tracker that enforces
//! global and per-customer limits at payment confirmation ([`usage`]).

pub mod calculator;
pub mod usage;
pub mod validator;

use rust_decimal::Decimal;
use shared::money::round_money;

/// One cart line as seen by the rules engine: just the refs and numbers
/// needed for filter matching and arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: Option<i64>,
    pub variant_id: i64,
    pub quantity: i64,
    pub unit_price: Decimal,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }
}

/// Cart subtotal across all lines
pub fn cart_subtotal(cart: &[CartLine]) -> Decimal {
    round_money(cart.iter().map(|l| l.line_total()).sum())
}

/// Total item quantity across all lines
pub fn cart_quantity(cart: &[CartLine]) -> i64 {
    cart.iter().map(|l| l.quantity).sum()
}
