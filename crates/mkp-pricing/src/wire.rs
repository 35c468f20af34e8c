//! Wire-boundary price conversion.
//!
//! Prices arrive from HTTP/CLI callers as decimal numbers. Internally every
//! amount is [`Micros`]; `f64` is only produced or consumed here:
//!
//! | Direction                 | Function            |
//! |---------------------------|---------------------|
//! | internal → JSON / display | [`micros_to_price`] |
//! | JSON / CLI → internal     | [`price_to_micros`] |

use crate::{Micros, PricingError, MICROS_PER_UNIT};

/// Convert integer micros to `f64` for serialization only.
pub fn micros_to_price(m: Micros) -> f64 {
    m.raw() as f64 / MICROS_PER_UNIT as f64
}

/// Convert an `f64` price received at the wire boundary into [`Micros`].
///
/// Rounds to the nearest micro. Sign is preserved; rejecting negative
/// prices is the catalog's validation concern, not a conversion failure.
///
/// # Errors
/// [`PricingError::NotFinite`] for NaN/Inf, [`PricingError::Overflow`] if
/// the scaled value does not fit `i64`.
pub fn price_to_micros(price: f64) -> Result<Micros, PricingError> {
    if !price.is_finite() {
        return Err(PricingError::NotFinite);
    }
    let scaled = price * MICROS_PER_UNIT as f64;
    // f64 -> i64 casts saturate silently; reject instead.
    // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
    if scaled >= i64::MAX as f64 || scaled < i64::MIN as f64 {
        return Err(PricingError::Overflow);
    }
    Ok(Micros::new(scaled.round() as i64))
}
