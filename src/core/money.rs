//! Fixed-point money helpers.
//!
//! Balances are persisted as integer cents so the database never performs
//! floating point arithmetic. The public API speaks `Decimal` with two
//! fraction digits.

use crate::errors::{Error, Result};
use rust_decimal::{Decimal, prelude::ToPrimitive};

/// Number of fraction digits carried by every monetary value.
pub const SCALE: u32 = 2;

/// Converts a positive amount into cents.
///
/// Rejects zero, negative amounts and anything finer than one cent.
pub fn to_cents(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO || amount.normalize().scale() > SCALE {
        return Err(Error::InvalidAmount { amount });
    }

    (amount * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or(Error::InvalidAmount { amount })
}

/// Converts stored cents back into a two-digit decimal.
#[must_use]
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, SCALE)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_cents_accepts_two_fraction_digits() {
        assert_eq!(to_cents(dec!(100)).unwrap(), 10_000);
        assert_eq!(to_cents(dec!(12.34)).unwrap(), 1_234);
        assert_eq!(to_cents(dec!(0.01)).unwrap(), 1);
        // Trailing zeros beyond the scale are harmless
        assert_eq!(to_cents(dec!(10.500)).unwrap(), 1_050);
    }

    #[test]
    fn test_to_cents_rejects_invalid_amounts() {
        assert!(matches!(
            to_cents(Decimal::ZERO),
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            to_cents(dec!(-5)),
            Err(Error::InvalidAmount { .. })
        ));
        assert!(matches!(
            to_cents(dec!(1.005)),
            Err(Error::InvalidAmount { .. })
        ));
    }

    #[test]
    fn test_from_cents() {
        assert_eq!(from_cents(15_000), dec!(150));
        assert_eq!(from_cents(1_234), dec!(12.34));
        assert_eq!(from_cents(0), Decimal::ZERO);
    }
}
