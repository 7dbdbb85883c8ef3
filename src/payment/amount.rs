//! Exact decimal amounts and gas limits.
//!
//! User-entered amounts are decimal strings in the native unit. They are
//! converted to integer smallest units with string arithmetic only, so no
//! value ever passes through a float.

use crate::error::{Error, Result};
use primitive_types::U256;

/// Decimal places of the native currency.
pub const NATIVE_DECIMALS: u8 = 18;

/// Largest supported `decimals`; `10^77` is the biggest power of ten a
/// `U256` holds.
const MAX_DECIMALS: u8 = 77;

/// Convert a decimal string to smallest units with `decimals` places.
///
/// Accepts `"1"`, `"1.5"`, `".5"` and `"1."`. Rejects signs, exponents,
/// separators and fractions longer than `decimals`.
///
/// # Errors
///
/// Returns [`Error::InvalidAmount`] if the string is not a plain
/// non-negative decimal or does not fit in 256 bits.
pub fn parse_units(amount: &str, decimals: u8) -> Result<U256> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidAmount("amount is empty".to_string()));
    }
    if decimals > MAX_DECIMALS {
        return Err(Error::InvalidAmount(format!(
            "unsupported decimals: {decimals}"
        )));
    }

    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(Error::InvalidAmount(format!("'{amount}' has no digits")));
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidAmount(format!(
            "'{amount}' is not a non-negative decimal number"
        )));
    }
    if fraction.len() > usize::from(decimals) {
        return Err(Error::InvalidAmount(format!(
            "'{amount}' has more than {decimals} decimal places"
        )));
    }

    let mut digits = String::with_capacity(whole.len() + usize::from(decimals));
    digits.push_str(whole);
    digits.push_str(fraction);
    for _ in fraction.len()..usize::from(decimals) {
        digits.push('0');
    }
    if digits.is_empty() {
        digits.push('0');
    }

    U256::from_dec_str(&digits)
        .map_err(|_| Error::InvalidAmount(format!("'{amount}' is too large")))
}

/// Convert an amount in the native unit to smallest units.
///
/// # Errors
///
/// See [`parse_units`].
pub fn parse_native_amount(amount: &str) -> Result<U256> {
    parse_units(amount, NATIVE_DECIMALS)
}

/// Render smallest units as a decimal string with `decimals` places.
///
/// Trailing fractional zeros are trimmed; whole amounts keep one (`"2.0"`).
#[must_use]
pub fn format_units(value: U256, decimals: u8) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let scale = U256::exp10(usize::from(decimals));
    let (whole, remainder) = value.div_mod(scale);
    if decimals == 0 {
        return whole.to_string();
    }

    let fraction = format!(
        "{:0>width$}",
        remainder.to_string(),
        width = usize::from(decimals)
    );
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Gas limit for a transaction: `ceil(estimate * percent / 100)`.
#[must_use]
pub fn apply_gas_margin(estimate: U256, percent: u64) -> U256 {
    let (quotient, remainder) = estimate
        .saturating_mul(U256::from(percent))
        .div_mod(U256::from(100u64));
    if remainder.is_zero() {
        quotient
    } else {
        quotient.saturating_add(U256::one())
    }
}
