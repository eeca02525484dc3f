//! Decimal money helpers.
//!
//! The marketplace prices everything in a single currency with two decimal
//! places, so amounts are plain [`Decimal`] values rather than a
//! currency-tagged price type.

use rust_decimal::{Decimal, RoundingStrategy};

/// Format an amount as a display price (e.g., `$19.99`).
#[must_use]
pub fn format_price(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// Subtotal for a quantity of a unit price.
#[must_use]
pub fn line_total(unit_price: Decimal, quantity: u32) -> Decimal {
    unit_price * Decimal::from(quantity)
}
