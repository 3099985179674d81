use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Deserialize;

use crate::error::{ImportError, Result};

/// Separator convention of the numbers in a bank export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecimalConvention {
    /// `1.234,56` (German and Spanish exports)
    DecimalComma,
    /// `1,234.56`
    DecimalDot,
}

impl DecimalConvention {
    pub fn thousands_separator(&self) -> char {
        match self {
            DecimalConvention::DecimalComma => '.',
            DecimalConvention::DecimalDot => ',',
        }
    }

    pub fn decimal_separator(&self) -> char {
        match self {
            DecimalConvention::DecimalComma => ',',
            DecimalConvention::DecimalDot => '.',
        }
    }
}

/// Converts a bank formatted number into an exact decimal.
///
/// All thousands separators are removed, the decimal separator is replaced by a
/// dot and the result has to be a plain decimal numeral (optional sign, digits,
/// optional fraction). Exponents, currency symbols or a second decimal separator
/// are rejected with [`ImportError::MalformedAmount`].
pub fn parse_amount(text: &str, convention: DecimalConvention) -> Result<BigDecimal> {
    let trimmed = text.trim();
    let without_thousands: String = trimmed
        .chars()
        .filter(|c| *c != convention.thousands_separator())
        .collect();
    let canonical = without_thousands.replace(convention.decimal_separator(), ".");

    if !is_decimal_numeral(&canonical) {
        return Err(ImportError::MalformedAmount(text.to_owned()));
    }

    BigDecimal::from_str(&canonical).map_err(|_| ImportError::MalformedAmount(text.to_owned()))
}

fn is_decimal_numeral(value: &str) -> bool {
    let digits = value
        .strip_prefix('-')
        .or_else(|| value.strip_prefix('+'))
        .unwrap_or(value);

    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    all_digits(integer) && fraction.map_or(true, all_digits)
}
