use chrono::{DateTime, Utc};
use mkp_pricing::Micros;
use serde::{Deserialize, Serialize};

use crate::{EngineError, ItemId, OrderId};

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Order lifecycle states, in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Initial state of every placed order.
    Pending,
    Shipped,
    Completed,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [Self::Pending, Self::Shipped, Self::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
        }
    }

    /// Parse a requested status. Case-insensitive, surrounding whitespace
    /// ignored. Unknown values are an [`EngineError::InvalidTransition`]
    /// with no `from` state.
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let t = s.trim();
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| EngineError::InvalidTransition {
                from: None,
                requested: t.to_string(),
            })
    }

    /// Position in the forward lifecycle.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Shipped => 1,
            Self::Completed => 2,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Order
// ---------------------------------------------------------------------------

/// A placed order for a single catalog item.
///
/// `item_id` is a weak reference: the item may since have been changed or
/// deleted. `item_name`, `unit_price_micros` and `discount_pct` are the
/// snapshot taken at reservation time. `charged_total_micros` is computed
/// once from that snapshot and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub item_name: String,
    pub quantity: i64,
    pub unit_price_micros: Micros,
    pub discount_pct: u8,
    pub charged_total_micros: Micros,
    pub customer_name: String,
    /// Normalized (digits only).
    pub customer_phone: String,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub created_at_utc: DateTime<Utc>,
    pub estimated_delivery_utc: DateTime<Utc>,
}

/// Input to `place_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub item_id: ItemId,
    pub quantity: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
}

/// Customer details shared by every line of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub delivery_address: String,
}

/// One cart line: an item and how many of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

impl Customer {
    pub fn order_line(&self, line: CartLine) -> NewOrder {
        NewOrder {
            item_id: line.item_id,
            quantity: line.quantity,
            customer_name: self.name.clone(),
            customer_phone: self.phone.clone(),
            delivery_address: self.delivery_address.clone(),
        }
    }
}
