//! mkp-orders
//!
//! Order placement, lookup and lifecycle on top of [`mkp_catalog`].
//!
//! - [`OrderLedger`]: places orders (reserve, price, insert) all-or-nothing,
//!   keeps them in placement order and maintains the phone index.
//! - [`LifecycleController`]: status changes under a [`LifecyclePolicy`].
//! - [`delivery_outlook`]: status-aware view of the delivery estimate.

mod delivery;
mod intake;
mod ledger;
mod lifecycle;
mod phone;

pub use delivery::{delivery_outlook, DeliveryEstimates, DeliveryOutlook, MAX_ESTIMATE_HOURS};
pub use intake::{validate_new_order, ValidatedOrder};
pub use ledger::{
    ItemDeletePolicy, LedgerSettings, LineOutcome, OrderLedger, DEFAULT_PHONE_DIGITS,
};
pub use lifecycle::{check_transition, LifecycleController, LifecyclePolicy};
pub use phone::{normalize_phone, validate_phone, PhoneIndex};
