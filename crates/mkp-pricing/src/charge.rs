//! Order charge computation.
//!
//! ```text
//! total = unit_price * (100 - discount_pct) / 100 * qty
//! ```
//!
//! evaluated exactly in `i128`, then rounded half-up to the minor unit.
//! The function is pure: callers feed it the item snapshot captured at
//! reservation time and store the result on the order, never recompute it.

use crate::{Micros, MICROS_PER_MINOR_UNIT};

// ---------------------------------------------------------------------------
// PricingError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Unit price below zero.
    NegativePrice { price: Micros },
    /// Discount percent above 100.
    DiscountOutOfRange { discount_pct: u8 },
    /// Quantity below one.
    NonPositiveQty { qty: i64 },
    /// Wire input was NaN or infinite.
    NotFinite,
    /// Result does not fit `i64` micros.
    Overflow,
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativePrice { price } => write!(f, "unit price must be >= 0, got {price}"),
            Self::DiscountOutOfRange { discount_pct } => {
                write!(f, "discount must be within 0..=100, got {discount_pct}")
            }
            Self::NonPositiveQty { qty } => write!(f, "quantity must be >= 1, got {qty}"),
            Self::NotFinite => write!(f, "price is not a finite number"),
            Self::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for PricingError {}

// ---------------------------------------------------------------------------
// compute_charge
// ---------------------------------------------------------------------------

/// Charged total for `qty` units at `unit_price` less `discount_pct` percent.
///
/// The result is always a whole number of minor units.
///
/// # Errors
/// See [`PricingError`]; all inputs are checked in every build profile.
pub fn compute_charge(unit_price: Micros, discount_pct: u8, qty: i64) -> Result<Micros, PricingError> {
    if unit_price.is_negative() {
        return Err(PricingError::NegativePrice { price: unit_price });
    }
    if discount_pct > 100 {
        return Err(PricingError::DiscountOutOfRange { discount_pct });
    }
    if qty < 1 {
        return Err(PricingError::NonPositiveQty { qty });
    }

    // Units: micros * percent.
    let scaled = i128::from(unit_price.raw())
        .checked_mul(i128::from(100 - discount_pct))
        .and_then(|v| v.checked_mul(i128::from(qty)))
        .ok_or(PricingError::Overflow)?;

    // micros*percent -> minor units: divide by 100 (percent) * MICROS_PER_MINOR_UNIT.
    let divisor = 100 * i128::from(MICROS_PER_MINOR_UNIT);
    let minor_units = scaled.checked_add(divisor / 2).ok_or(PricingError::Overflow)? / divisor;

    let micros = minor_units
        .checked_mul(i128::from(MICROS_PER_MINOR_UNIT))
        .and_then(|m| i64::try_from(m).ok())
        .ok_or(PricingError::Overflow)?;
    Ok(Micros::new(micros))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: i64) -> Micros {
        Micros::from_units(n).unwrap()
    }

    #[test]
    fn twenty_percent_off_hundred_times_three() {
        assert_eq!(compute_charge(units(100), 20, 3).unwrap(), units(240));
    }

    #[test]
    fn no_discount_is_plain_multiplication() {
        assert_eq!(compute_charge(units(50), 0, 2).unwrap(), units(100));
    }

    #[test]
    fn full_discount_is_free() {
        assert_eq!(compute_charge(units(75), 100, 4).unwrap(), Micros::ZERO);
    }

    #[test]
    fn exact_half_cent_rounds_up() {
        // 0.05 * 0.90 = 0.045 -> 0.05
        let total = compute_charge(Micros::new(50_000), 10, 1).unwrap();
        assert_eq!(total, Micros::new(50_000));
    }

    #[test]
    fn below_half_cent_rounds_down() {
        // 0.0149 * 1 = 0.0149 -> 0.01
        let total = compute_charge(Micros::new(14_900), 0, 1).unwrap();
        assert_eq!(total, Micros::new(10_000));
    }

    #[test]
    fn rounding_applies_to_line_total_not_unit_price() {
        // 9.99 at 15% off = 8.4915 per unit; x3 = 25.4745 -> 25.47
        let total = compute_charge(Micros::new(9_990_000), 15, 3).unwrap();
        assert_eq!(total, Micros::new(25_470_000));
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert_eq!(
            compute_charge(Micros::new(-1), 0, 1),
            Err(PricingError::NegativePrice { price: Micros::new(-1) })
        );
        assert_eq!(
            compute_charge(units(1), 101, 1),
            Err(PricingError::DiscountOutOfRange { discount_pct: 101 })
        );
        assert_eq!(
            compute_charge(units(1), 0, 0),
            Err(PricingError::NonPositiveQty { qty: 0 })
        );
    }

    #[test]
    fn overflow_is_an_error_not_a_wrap() {
        assert_eq!(compute_charge(Micros::MAX, 0, 2), Err(PricingError::Overflow));
    }
}
