//! Fixed-point currency amount.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Amount in the smallest currency unit (e.g. cents, kobo). Two decimals.
///
/// Arithmetic is checked: overflow and negative results are domain errors,
/// never silent wraps.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Construct from minor units. Negative amounts are rejected; the domain
    /// has no concept of a negative price or total.
    pub fn from_minor(minor: i64) -> DomainResult<Self> {
        if minor < 0 {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        Ok(Self(minor))
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    /// Non-failing sum for aggregates (revenue roll-ups). Saturates at
    /// `i64::MAX` instead of erroring so a report can never fail.
    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Multiply a unit price by a quantity (line subtotal).
    pub fn checked_mul(self, quantity: i64) -> DomainResult<Money> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_amounts() {
        assert!(Money::from_minor(-1).is_err());
        assert_eq!(Money::from_minor(0).unwrap(), Money::ZERO);
    }

    #[test]
    fn line_subtotal_is_price_times_quantity() {
        let price = Money::from_minor(5000).unwrap();
        assert_eq!(price.checked_mul(2).unwrap(), Money::from_minor(10000).unwrap());
    }

    #[test]
    fn add_and_mul_detect_overflow() {
        let max = Money::from_minor(i64::MAX).unwrap();
        assert!(max.checked_add(Money::from_minor(1).unwrap()).is_err());
        assert!(max.checked_mul(2).is_err());
    }

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_minor(10305).unwrap().to_string(), "103.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }
}
