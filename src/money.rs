//! Money Conversion Module
//!
//! Balances and transfer amounts are `i64` minor units (cents) everywhere
//! inside the crate. Decimal strings exist only at the HTTP boundary, and
//! every conversion in either direction goes through this module.
//!
//! ```rust
//! use bank_ledger::money::{format_minor_units, parse_minor_units};
//!
//! assert_eq!(parse_minor_units("30.5").unwrap(), 3050);
//! assert_eq!(format_minor_units(3050), "30.50");
//! ```

use rust_decimal::prelude::*;
use thiserror::Error;

/// Fractional digits of the ledger currency.
pub const MINOR_UNIT_SCALE: u32 = 2;

const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Money conversion errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Amount cannot be negative")]
    Negative,

    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount too large, would overflow")]
    Overflow,
}

/// Parse a client decimal string into minor units.
///
/// Zero is accepted here; whether zero is meaningful is the caller's call
/// (an opening balance may be zero, a transfer amount may not).
pub fn parse_minor_units(amount_str: &str) -> Result<i64, MoneyError> {
    let s = amount_str.trim();

    if s.is_empty() {
        return Err(MoneyError::InvalidFormat("amount cannot be empty".into()));
    }
    if s.starts_with('.') {
        return Err(MoneyError::InvalidFormat("use 0.5 not .5".into()));
    }
    if s.ends_with('.') {
        return Err(MoneyError::InvalidFormat("use 5.0 not 5.".into()));
    }
    if s.contains('e') || s.contains('E') {
        return Err(MoneyError::InvalidFormat(
            "scientific notation not allowed".into(),
        ));
    }
    if s.starts_with('+') {
        return Err(MoneyError::InvalidFormat("+ prefix not allowed".into()));
    }
    if s.starts_with('-') {
        return Err(MoneyError::Negative);
    }
    if !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(MoneyError::InvalidFormat(
            "only digits and a decimal point are allowed".into(),
        ));
    }

    let d = Decimal::from_str(s).map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
    parse_decimal(d)
}

/// Convert an already-parsed `Decimal` into minor units.
pub fn parse_decimal(decimal: Decimal) -> Result<i64, MoneyError> {
    if decimal.is_sign_negative() && !decimal.is_zero() {
        return Err(MoneyError::Negative);
    }

    let normalized = decimal.normalize();
    if normalized.scale() > MINOR_UNIT_SCALE {
        return Err(MoneyError::PrecisionOverflow {
            provided: normalized.scale(),
            max: MINOR_UNIT_SCALE,
        });
    }

    let scaled = normalized
        .checked_mul(Decimal::from(MINOR_UNITS_PER_MAJOR))
        .ok_or(MoneyError::Overflow)?;
    scaled.to_i64().ok_or(MoneyError::Overflow)
}

/// Render minor units as a decimal string with exactly two fractional digits.
pub fn format_minor_units(value: i64) -> String {
    let decimal = Decimal::new(value, MINOR_UNIT_SCALE);
    format!("{:.prec$}", decimal, prec = MINOR_UNIT_SCALE as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", 0)]
    #[case("0.00", 0)]
    #[case("1", 100)]
    #[case("30.5", 3050)]
    #[case("30.50", 3050)]
    #[case("0.01", 1)]
    #[case(" 12.34 ", 1234)]
    #[case("1.500", 150)]
    fn test_parse_valid(#[case] input: &str, #[case] expected: i64) {
        assert_eq!(parse_minor_units(input), Ok(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".5")]
    #[case("5.")]
    #[case("1e3")]
    #[case("+1")]
    #[case("abc")]
    #[case("1.2.3")]
    #[case("1_000")]
    #[case("1_000.00")]
    #[case("1,000.00")]
    #[case("1 000")]
    fn test_parse_rejects_bad_format(#[case] input: &str) {
        assert!(matches!(
            parse_minor_units(input),
            Err(MoneyError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert_eq!(parse_minor_units("-1.00"), Err(MoneyError::Negative));
    }

    #[test]
    fn test_parse_rejects_sub_cent_precision() {
        assert_eq!(
            parse_minor_units("0.001"),
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        );
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert_eq!(
            parse_minor_units("92233720368547758.08"),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_format() {
        assert_eq!(format_minor_units(0), "0.00");
        assert_eq!(format_minor_units(7), "0.07");
        assert_eq!(format_minor_units(7000), "70.00");
        assert_eq!(format_minor_units(123_456), "1234.56");
    }
}
