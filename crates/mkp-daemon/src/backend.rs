//! Storage backends behind the HTTP surface.
//!
//! Handlers only see [`Marketplace`]. `main.rs` picks the implementation
//! from `/storage/backend` at boot.

use std::sync::Arc;

use async_trait::async_trait;
use mkp_catalog::CatalogStore;
use mkp_config::EngineSettings;
use mkp_orders::{
    DeliveryEstimates, ItemDeletePolicy, LedgerSettings, LifecycleController, LifecyclePolicy,
    LineOutcome, OrderLedger,
};
use mkp_schemas::{
    CartLine, Clock, Customer, EngineError, IdSource, Item, ItemId, ItemPatch, NewItem, NewOrder,
    Order, OrderId,
};
use sqlx::PgPool;

#[async_trait]
pub trait Marketplace: Send + Sync {
    fn backend_name(&self) -> &'static str;

    fn delivery_estimates(&self) -> DeliveryEstimates;

    async fn add_item(&self, new: NewItem) -> Result<Item, EngineError>;
    async fn update_item(&self, item_id: ItemId, patch: ItemPatch) -> Result<Item, EngineError>;
    /// Honors the configured [`ItemDeletePolicy`].
    async fn delete_item(&self, item_id: ItemId) -> Result<(), EngineError>;
    async fn get_item(&self, item_id: ItemId) -> Result<Item, EngineError>;
    async fn list_items(&self) -> Result<Vec<Item>, EngineError>;

    async fn place_order(&self, new: NewOrder) -> Result<Order, EngineError>;

    /// One independent placement per line.
    async fn checkout(&self, customer: Customer, lines: Vec<CartLine>) -> Vec<LineOutcome> {
        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            let result = self.place_order(customer.order_line(line)).await;
            out.push(LineOutcome { line, result });
        }
        out
    }

    async fn list_orders(&self) -> Result<Vec<Order>, EngineError>;
    async fn get_order(&self, order_id: OrderId) -> Result<Order, EngineError>;
    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Order>, EngineError>;
    async fn delete_order(&self, order_id: OrderId) -> Result<Order, EngineError>;
    /// Honors the configured [`LifecyclePolicy`].
    async fn set_status(&self, order_id: OrderId, requested: &str) -> Result<Order, EngineError>;
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

pub struct MemoryMarketplace {
    lifecycle: LifecycleController,
    delete_policy: ItemDeletePolicy,
}

impl MemoryMarketplace {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdSource>, settings: &EngineSettings) -> Self {
        let catalog = Arc::new(CatalogStore::new(clock.clone(), ids.clone()));
        let ledger = Arc::new(OrderLedger::new(catalog, clock, ids, settings.ledger));
        Self {
            lifecycle: LifecycleController::new(ledger, settings.lifecycle_policy),
            delete_policy: settings.delete_policy,
        }
    }

    pub fn ledger(&self) -> &Arc<OrderLedger> {
        self.lifecycle.ledger()
    }
}

#[async_trait]
impl Marketplace for MemoryMarketplace {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn delivery_estimates(&self) -> DeliveryEstimates {
        self.ledger().settings().delivery
    }

    async fn add_item(&self, new: NewItem) -> Result<Item, EngineError> {
        self.ledger().catalog().add_item(new)
    }

    async fn update_item(&self, item_id: ItemId, patch: ItemPatch) -> Result<Item, EngineError> {
        self.ledger().catalog().update_item(item_id, &patch)
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<(), EngineError> {
        self.ledger().delete_item(item_id, self.delete_policy)
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Item, EngineError> {
        self.ledger().catalog().get_item(item_id)
    }

    async fn list_items(&self) -> Result<Vec<Item>, EngineError> {
        self.ledger().catalog().list_items()
    }

    async fn place_order(&self, new: NewOrder) -> Result<Order, EngineError> {
        self.ledger().place_order(new)
    }

    async fn checkout(&self, customer: Customer, lines: Vec<CartLine>) -> Vec<LineOutcome> {
        self.ledger().checkout(&customer, lines)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, EngineError> {
        self.ledger().list_orders()
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.ledger().get_order(order_id)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Order>, EngineError> {
        self.ledger().find_by_phone(phone)
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.lifecycle.delete_order(order_id)
    }

    async fn set_status(&self, order_id: OrderId, requested: &str) -> Result<Order, EngineError> {
        self.lifecycle.set_status(order_id, requested)
    }
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

pub struct PgMarketplace {
    pool: PgPool,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    ledger: LedgerSettings,
    delete_policy: ItemDeletePolicy,
    lifecycle_policy: LifecyclePolicy,
}

impl PgMarketplace {
    pub fn new(
        pool: PgPool,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdSource>,
        settings: &EngineSettings,
    ) -> Self {
        Self {
            pool,
            clock,
            ids,
            ledger: settings.ledger,
            delete_policy: settings.delete_policy,
            lifecycle_policy: settings.lifecycle_policy,
        }
    }
}

#[async_trait]
impl Marketplace for PgMarketplace {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn delivery_estimates(&self) -> DeliveryEstimates {
        self.ledger.delivery
    }

    async fn add_item(&self, new: NewItem) -> Result<Item, EngineError> {
        mkp_db::insert_item(&self.pool, self.ids.next_item_id(), &new, self.clock.now()).await
    }

    async fn update_item(&self, item_id: ItemId, patch: ItemPatch) -> Result<Item, EngineError> {
        mkp_db::update_item(&self.pool, item_id, &patch, self.clock.now()).await
    }

    async fn delete_item(&self, item_id: ItemId) -> Result<(), EngineError> {
        mkp_db::delete_item(&self.pool, item_id, self.delete_policy).await
    }

    async fn get_item(&self, item_id: ItemId) -> Result<Item, EngineError> {
        mkp_db::get_item(&self.pool, item_id).await
    }

    async fn list_items(&self) -> Result<Vec<Item>, EngineError> {
        mkp_db::list_items(&self.pool).await
    }

    async fn place_order(&self, new: NewOrder) -> Result<Order, EngineError> {
        mkp_db::place_order(
            &self.pool,
            self.ids.next_order_id(),
            &new,
            self.clock.now(),
            &self.ledger,
        )
        .await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, EngineError> {
        mkp_db::list_orders(&self.pool).await
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        mkp_db::get_order(&self.pool, order_id).await
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Order>, EngineError> {
        mkp_db::find_orders_by_phone(&self.pool, phone).await
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        mkp_db::delete_order(&self.pool, order_id).await
    }

    async fn set_status(&self, order_id: OrderId, requested: &str) -> Result<Order, EngineError> {
        mkp_db::set_order_status(&self.pool, order_id, requested, self.lifecycle_policy).await
    }
}
