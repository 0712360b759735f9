//! Monetary helpers: display rounding and lenient numeric coercion.
//!
//! All amounts are `Decimal`. Nothing in the calculator rounds; rounding to
//! two places happens once, at display time, through [`round_display`].

use core::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

/// Number of decimal places amounts are displayed with.
pub const DISPLAY_SCALE: u32 = 2;

/// Round an amount for display (2 places, midpoint away from zero).
pub fn round_display(amount: Decimal) -> Decimal {
    let rounded = amount.round_dp_with_strategy(DISPLAY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        // Avoid "-0.00" for tiny negative amounts.
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Format an amount with exactly two decimals (e.g. `105.00`).
pub fn format_amount(amount: Decimal) -> String {
    let mut rounded = round_display(amount);
    rounded.rescale(DISPLAY_SCALE);
    rounded.to_string()
}

/// `amount × rate / 100`.
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount.saturating_mul(rate) / Decimal::ONE_HUNDRED
}

/// Convert a float to `Decimal`, mapping NaN, infinities and out-of-range
/// values to zero.
pub fn coerce_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Parse a loosely-typed form value as a number.
///
/// Numbers pass through; strings are trimmed and parsed (plain, scientific,
/// then float syntax). Everything else, and anything non-finite, is `None`.
pub fn parse_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).and_then(Decimal::from_f64)),
        Value::String(s) => parse_str(s),
        _ => None,
    }
}

/// Lenient coercion of a form value: non-numeric input becomes zero.
pub fn coerce_json(value: &Value) -> Decimal {
    parse_json(value).unwrap_or(Decimal::ZERO)
}

/// Optional numeric form field: `null`, blank and non-numeric input all
/// mean "not set".
pub fn parse_optional_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => parse_json(other),
    }
}

fn parse_str(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        // Empty form fields read as zero.
        return Some(Decimal::ZERO);
    }
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
        .or_else(|| {
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .and_then(Decimal::from_f64)
        })
}
