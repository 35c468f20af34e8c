//! mkp-catalog
//!
//! Owns the set of sellable items and their stock/pricing metadata.
//!
//! - [`CatalogStore`]: thread-safe in-memory store; `reserve_stock` is the
//!   only stock-decrementing entry point and is atomic per item.
//! - [`validate`]: field rules shared with other storage backends.
//!
//! The catalog holds no reference to orders.

mod store;
pub mod validate;

pub use store::{CatalogStore, Reservation};
