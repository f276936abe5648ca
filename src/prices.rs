//! Prices

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while parsing a rate such as a tax rate.
#[derive(Debug, Error, PartialEq)]
pub enum RateError {
    /// The rate could not be parsed as a decimal or percentage.
    #[error("invalid rate: {0}")]
    Invalid(String),

    /// The rate was negative.
    #[error("rate must not be negative: {0}")]
    Negative(String),
}

/// Extracts a whole-currency amount from a display string such as `"Rs. 1,250"`.
///
/// Every non-digit character is discarded and the remaining digits are read as
/// a base-10 integer. Missing, empty or digit-free input yields `0`; a digit
/// run too long to fit in a `u64` saturates to `u64::MAX`.
pub fn extract_price(input: Option<&str>) -> u64 {
    let Some(input) = input else {
        return 0;
    };

    let digits: String = input.chars().filter(char::is_ascii_digit).collect();

    if digits.is_empty() {
        return 0;
    }

    digits.parse().unwrap_or(u64::MAX)
}

/// Parse a rate string, either a decimal (`"0.15"`) or a percentage (`"15%"`).
///
/// # Errors
///
/// - [`RateError::Invalid`]: the string is not a number.
/// - [`RateError::Negative`]: the rate is below zero.
pub fn parse_rate(s: &str) -> Result<Decimal, RateError> {
    let trimmed = s.trim();

    let rate = if let Some(percent) = trimmed.strip_suffix('%') {
        let value = percent
            .trim()
            .parse::<Decimal>()
            .map_err(|_err| RateError::Invalid(s.to_string()))?;

        value / Decimal::ONE_HUNDRED
    } else {
        trimmed
            .parse::<Decimal>()
            .map_err(|_err| RateError::Invalid(s.to_string()))?
    };

    if rate.is_sign_negative() && !rate.is_zero() {
        return Err(RateError::Negative(s.to_string()));
    }

    Ok(rate)
}
