//! Engine error taxonomy.
//!
//! Every failure the catalog, ledger, lifecycle controller or a storage
//! backend reports to a caller is an [`EngineError`]. Callers branch on
//! [`EngineError::kind`], never on the message text.

use mkp_pricing::PricingError;
use serde::{Deserialize, Serialize};

use crate::{ItemId, OrderId, OrderStatus};

/// Programmatic error class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    InvalidTransition,
    Conflict,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::NotFound => "NOT_FOUND",
            Self::InsufficientStock => "INSUFFICIENT_STOCK",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::Conflict => "CONFLICT",
            Self::Storage => "STORAGE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed input: bad range, empty required field.
    Validation { field: &'static str, reason: String },
    ItemNotFound { item_id: ItemId },
    OrderNotFound { order_id: OrderId },
    /// Requested quantity exceeds the stock present at reservation time.
    InsufficientStock {
        item_id: ItemId,
        requested: i64,
        available: i64,
    },
    /// Unknown status value (`from == None`) or a transition the active
    /// lifecycle policy forbids.
    InvalidTransition {
        from: Option<OrderStatus>,
        requested: String,
    },
    /// Item deletion refused while pending orders reference it.
    ItemInUse { item_id: ItemId, pending_orders: usize },
    /// Lock poisoning or a backend failure. Never a caller mistake.
    Storage(String),
}

impl EngineError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn storage(msg: impl std::fmt::Display) -> Self {
        Self::Storage(msg.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ItemNotFound { .. } | Self::OrderNotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::ItemInUse { .. } => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation { field, reason } => write!(f, "invalid {field}: {reason}"),
            Self::ItemNotFound { item_id } => write!(f, "item not found: {item_id}"),
            Self::OrderNotFound { order_id } => write!(f, "order not found: {order_id}"),
            Self::InsufficientStock {
                item_id,
                requested,
                available,
            } => write!(
                f,
                "insufficient stock for item {item_id}: requested {requested}, available {available}"
            ),
            Self::InvalidTransition {
                from: Some(from),
                requested,
            } => write!(f, "illegal status transition: {from} -> {requested}"),
            Self::InvalidTransition {
                from: None,
                requested,
            } => write!(f, "unknown order status: {requested:?}"),
            Self::ItemInUse {
                item_id,
                pending_orders,
            } => write!(
                f,
                "item {item_id} is referenced by {pending_orders} pending order(s)"
            ),
            Self::Storage(msg) => write!(f, "storage failure: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Pricing failures surface as validation of the offending input.
impl From<PricingError> for EngineError {
    fn from(e: PricingError) -> Self {
        let field = match e {
            PricingError::NegativePrice { .. } | PricingError::NotFinite => "price",
            PricingError::DiscountOutOfRange { .. } => "discount_pct",
            PricingError::NonPositiveQty { .. } | PricingError::Overflow => "quantity",
        };
        Self::validation(field, e.to_string())
    }
}
