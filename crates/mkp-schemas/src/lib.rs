//! mkp-schemas
//!
//! Shared data model for the marketplace engine: catalog items, orders,
//! the order status enum, the engine error taxonomy, and the two
//! collaborator seams every store depends on ([`Clock`], [`IdSource`]).
//!
//! No storage or synchronization lives here.

mod clock;
mod error;
mod ids;
mod item;
mod order;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, ErrorKind};
pub use ids::{IdSource, ItemId, OrderId, RandomIds, SequentialIds};
pub use item::{normalize_tags, parse_tags, Item, ItemPatch, ItemSnapshot, NewItem};
pub use order::{CartLine, Customer, NewOrder, Order, OrderStatus};

pub use mkp_pricing::Micros;
