//! Money handling
//!
//! Prices and order amounts are stored as integer cents (`i64`) and only
//! rendered as two-fractional-digit strings at the API boundary. All
//! conversions go through this module; nothing else touches the scale factor.

use rust_decimal::prelude::*;
use thiserror::Error;

const CENTS_PER_UNIT: i64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount format")]
    InvalidFormat,
    #[error("Amount must be non-negative")]
    Negative,
    #[error("Amount has more than two fractional digits")]
    TooPrecise,
    #[error("Amount out of range")]
    Overflow,
}

/// Format integer cents as a fixed two-fractional-digit string: 4999 -> "49.99".
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!(
        "{}{}.{:02}",
        sign,
        abs / CENTS_PER_UNIT as u64,
        abs % CENTS_PER_UNIT as u64
    )
}

/// Parse a decimal price string ("49.99") into integer cents.
///
/// Rejects negative values and anything finer than cents; there is no
/// rounding on the ingest path.
pub fn parse_price(input: &str) -> Result<i64, MoneyError> {
    let value = Decimal::from_str(input).map_err(|_| MoneyError::InvalidFormat)?;
    if value.is_sign_negative() {
        return Err(MoneyError::Negative);
    }
    let scaled = value * Decimal::from(CENTS_PER_UNIT);
    if scaled.fract() != Decimal::ZERO {
        return Err(MoneyError::TooPrecise);
    }
    scaled.to_i64().ok_or(MoneyError::Overflow)
}

/// Order amount for `qty` units at `price_cents`, with overflow detection.
pub fn amount_cents(price_cents: i64, qty: i64) -> Result<i64, MoneyError> {
    price_cents.checked_mul(qty).ok_or(MoneyError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(4999), "49.99");
        assert_eq!(format_cents(100), "1.00");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(1000000), "10000.00");
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("49.99"), Ok(4999));
        assert_eq!(parse_price("0.05"), Ok(5));
        assert_eq!(parse_price("100"), Ok(10000));
        assert_eq!(parse_price("1.5"), Ok(150));
    }

    #[test]
    fn test_parse_price_rejects_bad_input() {
        assert_eq!(parse_price("abc"), Err(MoneyError::InvalidFormat));
        assert_eq!(parse_price("-1.00"), Err(MoneyError::Negative));
        assert_eq!(parse_price("1.999"), Err(MoneyError::TooPrecise));
    }

    #[test]
    fn test_amount_cents() {
        assert_eq!(amount_cents(4999, 5), Ok(24995));
        assert_eq!(amount_cents(4999, 0), Ok(0));
        assert_eq!(amount_cents(i64::MAX, 2), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_format_parse_agree() {
        for cents in [0, 1, 99, 100, 4999, 123456789] {
            assert_eq!(parse_price(&format_cents(cents)), Ok(cents));
        }
    }
}
