//! # Money Module
//!
//! Amounts travel through the API as `Decimal` and are stored as integer
//! minor units so the database can compare balances inside conditional
//! updates. Every amount carries at most two decimal places.

use crate::error::{CoreError, CoreResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for every stored amount
pub const MONEY_SCALE: u32 = 2;

/// Convert an amount into minor units (cents).
///
/// Fails when the amount has more than [`MONEY_SCALE`] decimal places or
/// does not fit into an `i64`.
///
/// # Examples
/// ```
/// use depobank_core::to_minor_units;
/// use rust_decimal::Decimal;
///
/// assert_eq!(to_minor_units(Decimal::new(12345, 2)).unwrap(), 12345);
/// ```
pub fn to_minor_units(amount: Decimal) -> CoreResult<i64> {
    let normalized = amount.normalize();
    if normalized.scale() > MONEY_SCALE {
        return Err(CoreError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, MONEY_SCALE
        )));
    }

    normalized
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
        .ok_or_else(|| CoreError::InvalidAmount(format!("{} is out of range", amount)))
}

/// Convert minor units back into a two-place `Decimal`
pub fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_SCALE)
}

/// Round a computed amount to cents, midpoint away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Require a strictly positive amount and return it in minor units
pub fn positive_minor_units(amount: Decimal) -> CoreResult<i64> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidAmount(format!(
            "{} must be greater than zero",
            amount
        )));
    }
    to_minor_units(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(dec!(500)).unwrap(), 50_000);
        assert_eq!(to_minor_units(dec!(0.01)).unwrap(), 1);
        assert_eq!(to_minor_units(dec!(12.50)).unwrap(), 1_250);
        // Trailing zeros beyond the scale are fine
        assert_eq!(to_minor_units(dec!(1.2300)).unwrap(), 123);
    }

    #[test]
    fn test_to_minor_units_rejects_sub_cent() {
        let err = to_minor_units(dec!(1.005)).unwrap_err();
        assert!(err.is_invalid_amount());
    }

    #[test]
    fn test_to_minor_units_rejects_out_of_range() {
        let err = to_minor_units(Decimal::MAX).unwrap_err();
        assert!(err.is_invalid_amount());
        assert!(err.to_string().contains("out of range"));

        // Fits a Decimal but not an i64 of cents
        assert!(to_minor_units(dec!(100_000_000_000_000_000)).is_err());
        assert!(positive_minor_units(Decimal::MAX).is_err());
        assert!(to_minor_units(Decimal::MIN).is_err());
    }

    #[test]
    fn test_from_minor_units() {
        assert_eq!(from_minor_units(40_000), dec!(400.00));
        assert_eq!(from_minor_units(7), dec!(0.07));
    }

    #[test]
    fn test_positive_minor_units() {
        assert_eq!(positive_minor_units(dec!(100)).unwrap(), 10_000);
        assert!(positive_minor_units(dec!(0)).is_err());
        assert!(positive_minor_units(dec!(-3)).is_err());
    }

    #[test]
    fn test_round_money() {
        assert_eq!(round_money(dec!(92.0591)), dec!(92.06));
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
    }
}
