//! In-memory catalog store.
//!
//! # Locking
//!
//! ```text
//! RwLock<CatalogIndex>            structure: which items exist, in what order
//!   └─ Arc<Mutex<Item>> per item  fields, including stock
//! ```
//!
//! `reserve_stock` takes the index lock only long enough to clone the item's
//! `Arc`, then performs check-and-decrement under that item's mutex. Two
//! reservations on the same item are therefore serialized; reservations on
//! different items never contend.
//!
//! Poisoned locks are reported as [`EngineError::Storage`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use mkp_schemas::{Clock, EngineError, IdSource, Item, ItemId, ItemPatch, ItemSnapshot, NewItem};
use tracing::{debug, info, warn};

use crate::validate::{apply_patch, build_item};

// ---------------------------------------------------------------------------
// Reservation
// ---------------------------------------------------------------------------

/// Proof of a successful stock decrement.
///
/// Only the store constructs these, so [`CatalogStore::release_reservation`]
/// can never add back more than was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    snapshot: ItemSnapshot,
    quantity: i64,
    remaining_stock: i64,
}

impl Reservation {
    /// Item name/price/discount as observed under the reservation lock.
    pub fn snapshot(&self) -> &ItemSnapshot {
        &self.snapshot
    }

    pub fn item_id(&self) -> ItemId {
        self.snapshot.item_id
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Stock left immediately after this reservation.
    pub fn remaining_stock(&self) -> i64 {
        self.remaining_stock
    }
}

// ---------------------------------------------------------------------------
// CatalogStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct CatalogIndex {
    /// Insertion order for stable listing.
    order: Vec<ItemId>,
    items: HashMap<ItemId, Arc<Mutex<Item>>>,
}

pub struct CatalogStore {
    index: RwLock<CatalogIndex>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
}

fn poisoned<T>(_: PoisonError<T>) -> EngineError {
    EngineError::storage("catalog lock poisoned")
}

impl CatalogStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdSource>) -> Self {
        Self {
            index: RwLock::new(CatalogIndex::default()),
            clock,
            ids,
        }
    }

    pub fn add_item(&self, new: NewItem) -> Result<Item, EngineError> {
        let item = build_item(self.ids.next_item_id(), &new, self.clock.now())?;

        let mut index = self.index.write().map_err(poisoned)?;
        index.order.push(item.item_id);
        index
            .items
            .insert(item.item_id, Arc::new(Mutex::new(item.clone())));
        drop(index);

        info!(item_id = %item.item_id, name = %item.name, stock = item.stock, "catalog/add");
        Ok(item)
    }

    /// Partial update. Validation runs on a copy; the stored item changes
    /// only if every supplied field is valid.
    pub fn update_item(&self, item_id: ItemId, patch: &ItemPatch) -> Result<Item, EngineError> {
        let cell = self.cell(item_id)?;
        let mut item = cell.lock().map_err(poisoned)?;
        let next = apply_patch(&item, patch, self.clock.now())?;
        *item = next.clone();
        drop(item);

        info!(item_id = %item_id, "catalog/update");
        Ok(next)
    }

    pub fn delete_item(&self, item_id: ItemId) -> Result<(), EngineError> {
        let mut index = self.index.write().map_err(poisoned)?;
        if index.items.remove(&item_id).is_none() {
            return Err(EngineError::ItemNotFound { item_id });
        }
        index.order.retain(|id| *id != item_id);
        drop(index);

        info!(item_id = %item_id, "catalog/delete");
        Ok(())
    }

    pub fn get_item(&self, item_id: ItemId) -> Result<Item, EngineError> {
        let cell = self.cell(item_id)?;
        let item = cell.lock().map_err(poisoned)?;
        Ok(item.clone())
    }

    /// All items in insertion order.
    pub fn list_items(&self) -> Result<Vec<Item>, EngineError> {
        let index = self.index.read().map_err(poisoned)?;
        let mut out = Vec::with_capacity(index.order.len());
        for id in &index.order {
            if let Some(cell) = index.items.get(id) {
                out.push(cell.lock().map_err(poisoned)?.clone());
            }
        }
        Ok(out)
    }

    /// Whether the item is currently in the catalog.
    pub fn contains(&self, item_id: ItemId) -> Result<bool, EngineError> {
        Ok(self.index.read().map_err(poisoned)?.items.contains_key(&item_id))
    }

    /// Atomically check and decrement stock for one item.
    ///
    /// Never waits for stock: the call either succeeds now, or fails with
    /// [`EngineError::InsufficientStock`] leaving stock untouched.
    pub fn reserve_stock(&self, item_id: ItemId, quantity: i64) -> Result<Reservation, EngineError> {
        if quantity < 1 {
            return Err(EngineError::validation(
                "quantity",
                format!("must be >= 1, got {quantity}"),
            ));
        }

        let cell = self.cell(item_id)?;
        let mut item = cell.lock().map_err(poisoned)?;

        if item.stock < quantity {
            warn!(
                item_id = %item_id,
                requested = quantity,
                available = item.stock,
                "catalog/reserve rejected: insufficient stock"
            );
            return Err(EngineError::InsufficientStock {
                item_id,
                requested: quantity,
                available: item.stock,
            });
        }

        item.stock -= quantity;
        let reservation = Reservation {
            snapshot: item.snapshot(),
            quantity,
            remaining_stock: item.stock,
        };
        drop(item);

        debug!(item_id = %item_id, quantity, remaining = reservation.remaining_stock, "catalog/reserve");
        Ok(reservation)
    }

    /// Undo a reservation whose order could not be committed.
    ///
    /// This is a rollback for a failed multi-step placement, not restocking:
    /// deleting a committed order never calls it. If the item has been
    /// deleted in the meantime there is nothing to restore.
    pub fn release_reservation(&self, reservation: &Reservation) -> Result<(), EngineError> {
        let cell = match self.cell(reservation.item_id()) {
            Ok(cell) => cell,
            Err(EngineError::ItemNotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        let mut item = cell.lock().map_err(poisoned)?;
        item.stock = item
            .stock
            .checked_add(reservation.quantity)
            .ok_or_else(|| EngineError::storage("stock overflow on reservation rollback"))?;
        drop(item);

        warn!(
            item_id = %reservation.item_id(),
            quantity = reservation.quantity,
            "catalog/reserve rolled back"
        );
        Ok(())
    }

    fn cell(&self, item_id: ItemId) -> Result<Arc<Mutex<Item>>, EngineError> {
        let index = self.index.read().map_err(poisoned)?;
        index
            .items
            .get(&item_id)
            .cloned()
            .ok_or(EngineError::ItemNotFound { item_id })
    }
}
