use chrono::{DateTime, Utc};
use mkp_pricing::Micros;
use serde::{Deserialize, Serialize};

use crate::ItemId;

/// A sellable catalog entry.
///
/// Invariants (enforced by the catalog on every write): `name` is not blank,
/// `price_micros >= 0`, `stock >= 0`, `discount_pct <= 100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub item_id: ItemId,
    pub name: String,
    pub price_micros: Micros,
    pub stock: i64,
    pub discount_pct: u8,
    pub tags: Vec<String>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

impl Item {
    pub fn snapshot(&self) -> ItemSnapshot {
        ItemSnapshot {
            item_id: self.item_id,
            name: self.name.clone(),
            price_micros: self.price_micros,
            discount_pct: self.discount_pct,
        }
    }
}

/// Input to `add_item`. Numeric fields are wide so out-of-range values reach
/// validation instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub price_micros: Micros,
    pub stock: i64,
    #[serde(default)]
    pub discount_pct: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub price_micros: Option<Micros>,
    pub stock: Option<i64>,
    pub discount_pct: Option<i64>,
    pub tags: Option<Vec<String>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price_micros.is_none()
            && self.stock.is_none()
            && self.discount_pct.is_none()
            && self.tags.is_none()
    }
}

/// Point-in-time copy of the pricing-relevant item fields, captured under
/// the same lock as a stock reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub item_id: ItemId,
    pub name: String,
    pub price_micros: Micros,
    pub discount_pct: u8,
}

/// Split a comma-separated tag string (the form the storefront submits).
pub fn parse_tags(raw: &str) -> Vec<String> {
    normalize_tags(raw.split(','))
}

/// Trim tags and drop empty ones, preserving order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}
