//! Order ledger.
//!
//! # Placement
//!
//! ```text
//! validate input ─► reserve_stock ─► compute_charge ─► insert + index
//!                        │                  │                │
//!                  (nothing held)     release on Err    release on Err
//! ```
//!
//! The reservation is the commit point for stock; everything after it is
//! undone with [`CatalogStore::release_reservation`] if it fails, so a
//! rejected placement leaves neither an order nor a stock change behind.
//!
//! # Locking
//!
//! One `RwLock` guards the order map, the insertion order and the phone
//! index together, so the index can never disagree with the orders. The
//! catalog's locks are never held while this lock is taken. Placement's
//! commit and [`OrderLedger::delete_item`] both take this lock first and a
//! catalog lock second, which is the only nesting.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use mkp_catalog::{CatalogStore, Reservation};
use mkp_pricing::compute_charge;
use mkp_schemas::{
    CartLine, Clock, Customer, EngineError, IdSource, ItemId, NewOrder, Order, OrderId, OrderStatus,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::delivery::DeliveryEstimates;
use crate::intake::{validate_new_order, ValidatedOrder};
use crate::phone::{normalize_phone, PhoneIndex};

/// Default required phone length.
pub const DEFAULT_PHONE_DIGITS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Exact digit count after normalization; 0 accepts any length.
    pub phone_digits: usize,
    pub delivery: DeliveryEstimates,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            phone_digits: DEFAULT_PHONE_DIGITS,
            delivery: DeliveryEstimates::default(),
        }
    }
}

/// What happens to an item delete while pending orders reference it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemDeletePolicy {
    /// Delete regardless; orders keep their snapshot.
    #[default]
    Permissive,
    /// Refuse with `ItemInUse` while any referencing order is pending.
    RejectPendingOrders,
}

impl ItemDeletePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::RejectPendingOrders => "reject_pending_orders",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "permissive" => Some(Self::Permissive),
            "reject_pending_orders" => Some(Self::RejectPendingOrders),
            _ => None,
        }
    }
}

/// Result of one checkout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    pub line: CartLine,
    pub result: Result<Order, EngineError>,
}

#[derive(Default)]
struct LedgerState {
    order: Vec<OrderId>,
    orders: HashMap<OrderId, Order>,
    by_phone: PhoneIndex,
}

impl LedgerState {
    fn insert(&mut self, order: Order) {
        self.by_phone.insert(&order.customer_phone, order.order_id);
        self.order.push(order.order_id);
        self.orders.insert(order.order_id, order);
    }

    fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let order = self.orders.remove(&order_id)?;
        self.order.retain(|id| *id != order_id);
        self.by_phone.remove(&order.customer_phone, order_id);
        Some(order)
    }

    fn pending_for_item(&self, item_id: ItemId) -> usize {
        self.orders
            .values()
            .filter(|o| o.item_id == item_id && o.status == OrderStatus::Pending)
            .count()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> EngineError {
    EngineError::storage("order ledger lock poisoned")
}

pub struct OrderLedger {
    catalog: Arc<CatalogStore>,
    state: RwLock<LedgerState>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    settings: LedgerSettings,
}

impl OrderLedger {
    pub fn new(
        catalog: Arc<CatalogStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            catalog,
            state: RwLock::new(LedgerState::default()),
            clock,
            ids,
            settings,
        }
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Place one order. All-or-nothing.
    pub fn place_order(&self, new: NewOrder) -> Result<Order, EngineError> {
        let valid = validate_new_order(&new, self.settings.phone_digits)?;
        let reservation = self.catalog.reserve_stock(valid.item_id, valid.quantity)?;

        match self.commit(&reservation, valid) {
            Ok(order) => {
                info!(
                    order_id = %order.order_id,
                    item_id = %order.item_id,
                    quantity = order.quantity,
                    total = %order.charged_total_micros,
                    "orders/place"
                );
                Ok(order)
            }
            Err(e) => {
                if let Err(release_err) = self.catalog.release_reservation(&reservation) {
                    error!(
                        item_id = %reservation.item_id(),
                        quantity = reservation.quantity(),
                        "orders/place rollback failed: {release_err}"
                    );
                }
                Err(e)
            }
        }
    }

    fn commit(&self, reservation: &Reservation, valid: ValidatedOrder) -> Result<Order, EngineError> {
        let snap = reservation.snapshot();
        let total = compute_charge(snap.price_micros, snap.discount_pct, reservation.quantity())?;
        let created = self.clock.now();

        let order = Order {
            order_id: self.ids.next_order_id(),
            item_id: snap.item_id,
            item_name: snap.name.clone(),
            quantity: reservation.quantity(),
            unit_price_micros: snap.price_micros,
            discount_pct: snap.discount_pct,
            charged_total_micros: total,
            customer_name: valid.customer_name,
            customer_phone: valid.customer_phone,
            delivery_address: valid.delivery_address,
            status: OrderStatus::Pending,
            created_at_utc: created,
            estimated_delivery_utc: self.settings.delivery.at_placement(created)?,
        };

        // An item deleted since the reservation must not gain an order; the
        // check runs under the write lock so `delete_item` sees either this
        // order or a missing item.
        let mut state = self.state.write().map_err(poisoned)?;
        if !self.catalog.contains(order.item_id)? {
            return Err(EngineError::ItemNotFound {
                item_id: order.item_id,
            });
        }
        state.insert(order.clone());
        Ok(order)
    }

    /// One independent placement per line. Lines may succeed or fail
    /// individually; earlier successes are never rolled back.
    pub fn checkout(&self, customer: &Customer, lines: Vec<CartLine>) -> Vec<LineOutcome> {
        lines
            .into_iter()
            .map(|line| LineOutcome {
                line,
                result: self.place_order(customer.order_line(line)),
            })
            .collect()
    }

    /// All orders, oldest first.
    pub fn list_orders(&self) -> Result<Vec<Order>, EngineError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.orders.get(id).cloned())
            .collect())
    }

    pub fn get_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        let state = self.state.read().map_err(poisoned)?;
        state
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(EngineError::OrderNotFound { order_id })
    }

    /// Orders whose phone matches `phone` after normalization. Input with no
    /// digits matches nothing.
    pub fn find_by_phone(&self, phone: &str) -> Result<Vec<Order>, EngineError> {
        let key = normalize_phone(phone);
        if key.is_empty() {
            return Ok(Vec::new());
        }
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .by_phone
            .lookup(&key)
            .iter()
            .filter_map(|id| state.orders.get(id).cloned())
            .collect())
    }

    /// Remove an order and return it. Stock is not restored.
    pub fn delete_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        let mut state = self.state.write().map_err(poisoned)?;
        let order = state
            .remove(order_id)
            .ok_or(EngineError::OrderNotFound { order_id })?;
        drop(state);

        info!(order_id = %order_id, status = %order.status, "orders/delete");
        Ok(order)
    }

    /// Delete a catalog item subject to `policy`.
    ///
    /// Under `RejectPendingOrders` the ledger lock is held across the
    /// catalog delete. A placement that reserved stock before the delete
    /// re-checks the item under the write lock and fails with `ItemNotFound`.
    pub fn delete_item(&self, item_id: ItemId, policy: ItemDeletePolicy) -> Result<(), EngineError> {
        match policy {
            ItemDeletePolicy::Permissive => self.catalog.delete_item(item_id),
            ItemDeletePolicy::RejectPendingOrders => {
                let state = self.state.read().map_err(poisoned)?;
                let pending_orders = state.pending_for_item(item_id);
                if pending_orders > 0 {
                    return Err(EngineError::ItemInUse {
                        item_id,
                        pending_orders,
                    });
                }
                self.catalog.delete_item(item_id)
            }
        }
    }

    /// Replace an order's status with `next(current)`. Nothing else changes.
    pub(crate) fn update_status<F>(&self, order_id: OrderId, next: F) -> Result<Order, EngineError>
    where
        F: FnOnce(OrderStatus) -> Result<OrderStatus, EngineError>,
    {
        let mut state = self.state.write().map_err(poisoned)?;
        let order = state
            .orders
            .get_mut(&order_id)
            .ok_or(EngineError::OrderNotFound { order_id })?;
        order.status = next(order.status)?;
        Ok(order.clone())
    }
}
