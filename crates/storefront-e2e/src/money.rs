//! Money parsing with cent-level rounding.
//!
//! Prices come off the page as display text ("$  9.00", "$ 0.00"). Every
//! comparison between money values goes through [`to_cents`] so that float
//! drift (`0.1 + 0.2`) never decides a test.

use crate::result::{StoreError, StoreResult};

/// Parse a displayed amount, keeping only digits and the decimal point.
///
/// ```
/// use storefront_e2e::parse_money;
/// assert_eq!(parse_money("$  9.00").unwrap(), 9.0);
/// assert!(parse_money("free").is_err());
/// ```
pub fn parse_money(text: &str) -> StoreResult<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| StoreError::parse(format!("money (cleaned {cleaned:?})"), text))
}

/// Round an amount to integer cents
#[must_use]
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert cents back to a dollar amount
#[must_use]
pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Render cents the way the storefront displays them
#[must_use]
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}$ {}.{:02}", abs / 100, abs % 100)
}
