//! Fixed-point money type.
//!
//! # Scale
//!
//! All money amounts in the marketplace (item prices, charged totals) use a
//! 1e-6 (micros) fixed-point representation stored as `i64`.
//!
//! 1 currency unit = 1_000_000 Micros. The currency's minor unit (one cent,
//! one paisa) is [`MICROS_PER_MINOR_UNIT`] = 10_000 Micros. Charged totals
//! are always whole minor units; catalog prices may carry sub-cent precision.
//!
//! `Micros` wraps the raw `i64` with no `From<i64>` impl and no arithmetic
//! operators, so it cannot be mixed with stock counts or order quantities.
//! Pricing math runs in `i128` on [`Micros::raw`].
//!
//! # Serialization
//!
//! Serializes transparently as the raw integer. JSON consumers that want a
//! human amount use the `Display` form.

use serde::{Deserialize, Serialize};

/// Scale factor: 1 currency unit = 1_000_000 micros (6 decimal places).
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// One minor currency unit (1/100 of a unit) expressed in micros.
pub const MICROS_PER_MINOR_UNIT: i64 = 10_000;

// ---------------------------------------------------------------------------
// Micros newtype
// ---------------------------------------------------------------------------

/// A fixed-point monetary amount at 1e-6 scale (micros).
///
/// Use [`Micros::new`] for explicit construction and [`Micros::raw`] to
/// cross layer boundaries that need the integer (DB columns).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Micros(i64);

impl Micros {
    /// Zero monetary amount.
    pub const ZERO: Micros = Micros(0);

    /// Maximum representable value.
    pub const MAX: Micros = Micros(i64::MAX);

    #[inline]
    pub const fn new(raw: i64) -> Self {
        Micros(raw)
    }

    /// Whole currency units, e.g. `Micros::from_units(100)` is 100.00.
    ///
    /// Returns `None` on overflow.
    #[inline]
    pub fn from_units(units: i64) -> Option<Self> {
        units.checked_mul(MICROS_PER_UNIT).map(Micros)
    }

    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// `true` when the amount is an exact number of minor units.
    #[inline]
    pub fn is_whole_minor_units(self) -> bool {
        self.0 % MICROS_PER_MINOR_UNIT == 0
    }

}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Two decimals for whole minor units (`240.00`), six otherwise (`9.999500`).
impl std::fmt::Display for Micros {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / MICROS_PER_UNIT as u64;
        let frac = abs % MICROS_PER_UNIT as u64;
        if frac % MICROS_PER_MINOR_UNIT as u64 == 0 {
            write!(f, "{sign}{units}.{:02}", frac / MICROS_PER_MINOR_UNIT as u64)
        } else {
            write!(f, "{sign}{units}.{frac:06}")
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
