//! mkp-pricing
//!
//! Money representation and the pricing calculator.
//!
//! - [`Micros`]: fixed-point money at 1e-6 scale; no implicit `i64` mixing.
//! - [`compute_charge`]: `(unit price, discount %, quantity) -> charged total`,
//!   rounded half-up to the minor unit. Pure and deterministic.
//! - [`price_to_micros`] / [`micros_to_price`]: the only `f64` boundary.

mod charge;
mod fixedpoint;
mod wire;

pub use charge::{compute_charge, PricingError};
pub use fixedpoint::{Micros, MICROS_PER_MINOR_UNIT, MICROS_PER_UNIT};
pub use wire::{micros_to_price, price_to_micros};
