//! Delivery estimates.
//!
//! The ledger stores one estimate at placement (`created + pending_hours`).
//! [`delivery_outlook`] is a read-only view that also accounts for the
//! order's current status; it never writes back to the order.

use chrono::{DateTime, Duration, Utc};
use mkp_schemas::{EngineError, Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Upper bound accepted for either estimate (one year).
pub const MAX_ESTIMATE_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEstimates {
    pub pending_hours: i64,
    pub shipped_hours: i64,
}

impl Default for DeliveryEstimates {
    fn default() -> Self {
        Self {
            pending_hours: 3,
            shipped_hours: 2,
        }
    }
}

impl DeliveryEstimates {
    /// Estimate recorded on a freshly placed order.
    pub fn at_placement(&self, created_at: DateTime<Utc>) -> Result<DateTime<Utc>, EngineError> {
        add_hours(created_at, self.pending_hours).ok_or_else(|| {
            EngineError::validation(
                "pending_hours",
                format!(
                    "must be within 0..={MAX_ESTIMATE_HOURS}, got {}",
                    self.pending_hours
                ),
            )
        })
    }
}

fn add_hours(at: DateTime<Utc>, hours: i64) -> Option<DateTime<Utc>> {
    if !(0..=MAX_ESTIMATE_HOURS).contains(&hours) {
        return None;
    }
    at.checked_add_signed(Duration::try_hours(hours)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeliveryOutlook {
    Delivered,
    Expected { at_utc: DateTime<Utc> },
}

/// A shipped estimate that cannot be computed falls back to the stored one.
pub fn delivery_outlook(order: &Order, estimates: &DeliveryEstimates) -> DeliveryOutlook {
    match order.status {
        OrderStatus::Completed => DeliveryOutlook::Delivered,
        OrderStatus::Shipped => DeliveryOutlook::Expected {
            at_utc: add_hours(order.created_at_utc, estimates.shipped_hours)
                .unwrap_or(order.estimated_delivery_utc),
        },
        OrderStatus::Pending => DeliveryOutlook::Expected {
            at_utc: order.estimated_delivery_utc,
        },
    }
}
