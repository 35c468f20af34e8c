//! Shared runtime state for mkp-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The marketplace
//! backend does its own locking.

use std::sync::Arc;
use std::time::Duration;

use mkp_schemas::{ItemId, OrderId, OrderStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::backend::Marketplace;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    /// "added" | "updated" | "deleted"
    Catalog {
        action: String,
        item_id: ItemId,
    },
    /// "placed" | "status" | "deleted"
    Order {
        action: String,
        order_id: OrderId,
        status: OrderStatus,
    },
}

impl BusMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Heartbeat { .. } => "heartbeat",
            Self::Catalog { .. } => "catalog",
            Self::Order { .. } => "order",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub market: Arc<dyn Marketplace>,
    pub config_hash: Option<String>,
}

impl AppState {
    pub fn new(market: Arc<dyn Marketplace>, config_hash: Option<String>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "mkp-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            market,
            config_hash,
        }
    }

    /// Fire-and-forget; no subscribers is not an error.
    pub fn publish(&self, msg: BusMsg) {
        let _ = self.bus.send(msg);
    }
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
