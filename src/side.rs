//! BACK/LAY dispatch
//!
//! The two order sides have different exposure formulas and different
//! resting-candidate comparators. Keeping both in one place means a future
//! third side only has to extend this module, not every call site that
//! currently matches on `Side::Back | Side::Lay`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::round2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_side", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Back,
    Lay,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Back => Side::Lay,
            Side::Lay => Side::Back,
        }
    }

    /// Exposure required to place `stake` at `price` on this side.
    pub fn required_exposure(self, price: Decimal, stake: Decimal) -> Decimal {
        match self {
            Side::Back => stake,
            Side::Lay => round2((price - Decimal::ONE) * stake),
        }
    }

    /// `true` if a resting order at `candidate_price` may match an incoming
    /// order on this side quoting `incoming_price`.
    ///
    /// An incoming BACK accepts LAY candidates priced at or below its limit;
    /// an incoming LAY accepts BACK candidates priced at or above its limit.
    pub fn crosses(self, incoming_price: Decimal, candidate_price: Decimal) -> bool {
        match self {
            Side::Back => candidate_price <= incoming_price,
            Side::Lay => candidate_price >= incoming_price,
        }
    }

    /// SQL ordering clause for the candidate scan on the opposite side of
    /// `self`: best price first, then oldest first.
    ///
    /// Resting LAY candidates for an incoming BACK sort ascending on price
    /// (lowest first); resting BACK candidates for an incoming LAY sort
    /// descending (highest first).
    pub fn candidate_order_by(self) -> &'static str {
        match self {
            Side::Back => "price ASC, created_at ASC",
            Side::Lay => "price DESC, created_at ASC",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Back => write!(f, "back"),
            Side::Lay => write!(f, "lay"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn back_exposure_is_stake() {
        assert_eq!(Side::Back.required_exposure(dec!(2.50), dec!(100)), dec!(100));
    }

    #[test]
    fn lay_exposure_is_liability() {
        assert_eq!(Side::Lay.required_exposure(dec!(3.00), dec!(80)), dec!(160));
    }

    #[test]
    fn back_crosses_lay_at_or_below_limit() {
        assert!(Side::Back.crosses(dec!(2.50), dec!(2.40)));
        assert!(Side::Back.crosses(dec!(2.50), dec!(2.50)));
        assert!(!Side::Back.crosses(dec!(2.50), dec!(2.60)));
    }

    #[test]
    fn lay_crosses_back_at_or_above_limit() {
        assert!(Side::Lay.crosses(dec!(2.50), dec!(2.60)));
        assert!(Side::Lay.crosses(dec!(2.50), dec!(2.50)));
        assert!(!Side::Lay.crosses(dec!(2.50), dec!(2.40)));
    }

    #[test]
    fn opposite_is_involutive() {
        assert_eq!(Side::Back.opposite(), Side::Lay);
        assert_eq!(Side::Lay.opposite(), Side::Back);
    }
}
