//! Fixed-point money.
//!
//! Amounts are carried as signed integers of minor units (cents), two decimal
//! places, never binary floating point. Arithmetic between two amounts
//! requires matching currencies; a mismatch is an error, never a coercion.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The single currency this service supports.
pub const SUPPORTED_CURRENCY: &str = "EUR";

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn eur() -> Self {
        Self(SUPPORTED_CURRENCY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_supported(&self) -> bool {
        self.0 == SUPPORTED_CURRENCY
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: CurrencyCode, right: CurrencyCode },

    #[error("amount overflow")]
    Overflow,
}

/// A signed monetary amount in minor units of one currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Money {
    minor: i64,
    currency: CurrencyCode,
}

impl Money {
    pub fn new(minor: i64, currency: CurrencyCode) -> Self {
        Self { minor, currency }
    }

    pub fn minor(&self) -> i64 {
        self.minor
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    /// Subtract `other` from `self`.
    ///
    /// Fails on differing currencies or on `i64` overflow.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }

        let minor = self
            .minor
            .checked_sub(other.minor)
            .ok_or(MoneyError::Overflow)?;

        Ok(Money::new(minor, self.currency.clone()))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.minor < 0 { "-" } else { "" };
        let abs = self.minor.unsigned_abs();
        write!(f, "{sign}{}.{:02} {}", abs / 100, abs % 100, self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtract_same_currency() {
        let balance = Money::new(11_100, CurrencyCode::eur());
        let amount = Money::new(10_000, CurrencyCode::eur());

        let remaining = balance.checked_sub(&amount).unwrap();
        assert_eq!(remaining.minor(), 1_100);
        assert!(remaining.is_positive());
    }

    #[test]
    fn subtract_to_zero_is_not_positive() {
        let balance = Money::new(500, CurrencyCode::eur());
        let amount = Money::new(500, CurrencyCode::eur());

        let remaining = balance.checked_sub(&amount).unwrap();
        assert!(!remaining.is_positive());
    }

    #[test]
    fn currency_mismatch_is_an_error() {
        let balance = Money::new(100, CurrencyCode::new("USD"));
        let amount = Money::new(50, CurrencyCode::eur());

        let err = balance.checked_sub(&amount).unwrap_err();
        assert!(matches!(err, MoneyError::CurrencyMismatch { .. }));
    }

    #[test]
    fn overflow_is_an_error() {
        let balance = Money::new(i64::MIN, CurrencyCode::eur());
        let amount = Money::new(1, CurrencyCode::eur());

        assert_eq!(balance.checked_sub(&amount).unwrap_err(), MoneyError::Overflow);
    }

    #[test]
    fn display_formats_two_decimal_places() {
        assert_eq!(
            Money::new(11_100, CurrencyCode::eur()).to_string(),
            "111.00 EUR"
        );
        assert_eq!(Money::new(-1, CurrencyCode::eur()).to_string(), "-0.01 EUR");
    }
}
