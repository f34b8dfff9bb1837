//! Fixed-point money helpers
//!
//! All monetary math runs on [`rust_decimal::Decimal`]; binary floats are only
//! permitted at the fiscal-authority wire boundary. Percentages are rounded to
//! 2 decimal places, half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Round to 2 decimal places, half away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Margin % = (sale − cost) / cost × 100, rounded to 2 dp
///
/// Zero when the cost is zero.
pub fn margin_pct(costo: Decimal, venta: Decimal) -> Decimal {
    if costo.is_zero() {
        return Decimal::ZERO;
    }
    round2((venta - costo) / costo * HUNDRED)
}

/// Percentage of `part` over `whole`, rounded to 2 dp
///
/// Zero when the whole is zero.
pub fn pct_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    round2(part / whole * HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_margin_pct() {
        assert_eq!(margin_pct(dec("150"), dec("250")), dec("66.67"));
        assert_eq!(margin_pct(dec("100"), dec("150")), dec("50.00"));
        assert_eq!(margin_pct(dec("100"), dec("80")), dec("-20.00"));
    }

    #[test]
    fn test_margin_pct_zero_cost() {
        assert_eq!(margin_pct(Decimal::ZERO, dec("250")), Decimal::ZERO);
    }

    #[test]
    fn test_pct_of() {
        assert_eq!(pct_of(dec("-1000"), dec("10000")), dec("-10.00"));
        assert_eq!(pct_of(dec("1"), dec("3")), dec("33.33"));
        assert_eq!(pct_of(dec("5"), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(dec("1.005")), dec("1.01"));
        assert_eq!(round2(dec("-1.005")), dec("-1.01"));
        assert_eq!(round2(dec("2.344")), dec("2.34"));
    }
}
