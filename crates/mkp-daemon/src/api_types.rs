//! Request and response types for all mkp-daemon HTTP endpoints.
//!
//! Money crosses the wire as decimal `f64` prices (`price`, `unit_price`,
//! `charged_total`) next to the exact `*_micros` integers. Incoming prices
//! are converted once with `price_to_micros`; nothing downstream sees `f64`.

use chrono::{DateTime, Utc};
use mkp_orders::{delivery_outlook, DeliveryEstimates, DeliveryOutlook};
use mkp_pricing::{micros_to_price, price_to_micros};
use mkp_schemas::{
    parse_tags, CartLine, Customer, EngineError, Item, ItemId, ItemPatch, NewItem, Order,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
    /// "memory" | "postgres"
    pub backend: &'static str,
    /// SHA-256 of the canonical config the daemon booted with.
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// `ErrorKind` code, e.g. "INSUFFICIENT_STOCK".
    pub error: String,
    pub message: String,
}

impl From<&EngineError> for ErrorResponse {
    fn from(e: &EngineError) -> Self {
        Self {
            error: e.kind().as_str().to_string(),
            message: e.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Tags arrive either as a list or as one comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

impl Default for TagsInput {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TagsInput {
    pub fn into_tags(self) -> Vec<String> {
        match self {
            Self::List(v) => v,
            Self::Csv(s) => parse_tags(&s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub price: f64,
    pub stock: i64,
    #[serde(default)]
    pub discount_pct: i64,
    #[serde(default)]
    pub tags: TagsInput,
}

impl CreateItemRequest {
    pub fn into_new_item(self) -> Result<NewItem, EngineError> {
        Ok(NewItem {
            name: self.name,
            price_micros: price_to_micros(self.price)?,
            stock: self.stock,
            discount_pct: self.discount_pct,
            tags: self.tags.into_tags(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub discount_pct: Option<i64>,
    #[serde(default)]
    pub tags: Option<TagsInput>,
}

impl UpdateItemRequest {
    pub fn into_patch(self) -> Result<ItemPatch, EngineError> {
        Ok(ItemPatch {
            name: self.name,
            price_micros: self.price.map(price_to_micros).transpose()?,
            stock: self.stock,
            discount_pct: self.discount_pct,
            tags: self.tags.map(TagsInput::into_tags),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemView {
    pub item_id: ItemId,
    pub name: String,
    pub price: f64,
    pub price_micros: i64,
    pub stock: i64,
    pub discount_pct: u8,
    pub tags: Vec<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl From<Item> for ItemView {
    fn from(i: Item) -> Self {
        Self {
            item_id: i.item_id,
            name: i.name,
            price: micros_to_price(i.price_micros),
            price_micros: i.price_micros.raw(),
            stock: i.stock,
            discount_pct: i.discount_pct,
            tags: i.tags,
            created_at_utc: i.created_at_utc,
            updated_at_utc: i.updated_at_utc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemListResponse {
    pub items: Vec<ItemView>,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub unit_price: f64,
    pub charged_total: f64,
    pub delivery: DeliveryOutlook,
}

impl OrderView {
    pub fn new(order: Order, estimates: &DeliveryEstimates) -> Self {
        Self {
            unit_price: micros_to_price(order.unit_price_micros),
            charged_total: micros_to_price(order.charged_total_micros),
            delivery: delivery_outlook(&order, estimates),
            order,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer: Customer,
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutLineView {
    pub item_id: ItemId,
    pub quantity: i64,
    pub ok: bool,
    pub order: Option<OrderView>,
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub placed: usize,
    pub failed: usize,
    pub lines: Vec<CheckoutLineView>,
}
