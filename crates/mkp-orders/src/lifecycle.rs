//! Order lifecycle controller.
//!
//! # State diagram
//!
//! ```text
//!   place_order ──► pending ──► shipped ──► completed
//! ```
//!
//! Under [`LifecyclePolicy::Permissive`] any known status may be set at any
//! time, including backwards moves. [`LifecyclePolicy::ForwardOnly`] allows
//! only the arrows above (skipping `shipped` is allowed), treats
//! same-state requests as no-ops and makes `completed` terminal.
//!
//! A status change touches `status` only. Totals, quantity and timestamps
//! are fixed at placement.

use std::sync::Arc;

use mkp_schemas::{EngineError, Order, OrderId, OrderStatus};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::OrderLedger;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePolicy {
    #[default]
    Permissive,
    ForwardOnly,
}

impl LifecyclePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::ForwardOnly => "forward_only",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "permissive" => Some(Self::Permissive),
            "forward_only" => Some(Self::ForwardOnly),
            _ => None,
        }
    }
}

/// Check `from -> to` against `policy`.
pub fn check_transition(
    policy: LifecyclePolicy,
    from: OrderStatus,
    to: OrderStatus,
) -> Result<(), EngineError> {
    let allowed = match policy {
        LifecyclePolicy::Permissive => true,
        LifecyclePolicy::ForwardOnly => from == to || from.rank() < to.rank(),
    };
    if allowed {
        Ok(())
    } else {
        Err(EngineError::InvalidTransition {
            from: Some(from),
            requested: to.as_str().to_string(),
        })
    }
}

/// Applies status changes to orders held by an [`OrderLedger`].
#[derive(Clone)]
pub struct LifecycleController {
    ledger: Arc<OrderLedger>,
    policy: LifecyclePolicy,
}

impl LifecycleController {
    pub fn new(ledger: Arc<OrderLedger>, policy: LifecyclePolicy) -> Self {
        Self { ledger, policy }
    }

    pub fn ledger(&self) -> &Arc<OrderLedger> {
        &self.ledger
    }

    /// Set an order's status from a user-supplied string.
    ///
    /// `NotFound` wins over an unknown status value.
    pub fn set_status(&self, order_id: OrderId, requested: &str) -> Result<Order, EngineError> {
        let policy = self.policy;
        let result = self.ledger.update_status(order_id, |from| {
            let to = OrderStatus::parse(requested)?;
            check_transition(policy, from, to)?;
            Ok(to)
        });

        match &result {
            Ok(order) => info!(
                order_id = %order_id,
                status = %order.status,
                policy = policy.as_str(),
                "orders/status"
            ),
            Err(e @ EngineError::InvalidTransition { .. }) => {
                warn!(order_id = %order_id, requested, policy = policy.as_str(), "orders/status rejected: {e}")
            }
            Err(_) => {}
        }
        result
    }

    /// Status never gates deletion.
    pub fn delete_order(&self, order_id: OrderId) -> Result<Order, EngineError> {
        self.ledger.delete_order(order_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn permissive_allows_every_pair() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert!(check_transition(LifecyclePolicy::Permissive, from, to).is_ok());
            }
        }
    }

    #[test]
    fn forward_only_table() {
        let p = LifecyclePolicy::ForwardOnly;
        assert!(check_transition(p, Pending, Shipped).is_ok());
        assert!(check_transition(p, Shipped, Completed).is_ok());
        assert!(check_transition(p, Pending, Completed).is_ok());
        assert!(check_transition(p, Shipped, Shipped).is_ok());
        assert!(check_transition(p, Completed, Completed).is_ok());

        assert!(check_transition(p, Shipped, Pending).is_err());
        assert!(check_transition(p, Completed, Pending).is_err());
        assert!(check_transition(p, Completed, Shipped).is_err());
    }

    #[test]
    fn rejection_names_current_state() {
        let err = check_transition(LifecyclePolicy::ForwardOnly, Completed, Pending).unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidTransition {
                from: Some(Completed),
                requested: "pending".to_string()
            }
        );
    }

    #[test]
    fn policy_parses_config_spelling() {
        assert_eq!(LifecyclePolicy::parse("forward_only"), Some(LifecyclePolicy::ForwardOnly));
        assert_eq!(LifecyclePolicy::parse("permissive"), Some(LifecyclePolicy::Permissive));
        assert_eq!(LifecyclePolicy::parse("strict"), None);
        assert_eq!(LifecyclePolicy::default(), LifecyclePolicy::Permissive);
    }
}
