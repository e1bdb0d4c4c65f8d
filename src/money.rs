//! Fixed-point money/odds helpers.
//!
//! Every monetary and odds value in this core is a `rust_decimal::Decimal`
//! at a fixed scale of 2 fractional digits (`spec.md` §3, §9). Arithmetic on
//! two scale-2 values can produce more than 2 fractional digits (e.g.
//! `(price - 1) * stake`); `round2` is the one place that rounding happens,
//! using round-half-up so the core's persisted amounts are reproducible
//! regardless of the database driver's own rounding behavior.

use rust_decimal::{Decimal, RoundingStrategy};

/// Rounds to 2 fractional digits, half-away-from-zero.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `true` if `amount` already has at most 2 fractional digits, i.e. storing
/// it loses no precision. Used to reject inputs that would silently round
/// on write (`CoreError::InvalidInput`, "decimal precision overflow").
pub fn has_valid_scale(amount: Decimal) -> bool {
    amount.scale() <= 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn exact_values_pass_through() {
        assert_eq!(round2(dec!(160.00)), dec!(160.00));
    }

    #[test]
    fn scale_validation_catches_overflow() {
        assert!(has_valid_scale(dec!(2.50)));
        assert!(has_valid_scale(dec!(2)));
        assert!(!has_valid_scale(dec!(2.505)));
    }
}
