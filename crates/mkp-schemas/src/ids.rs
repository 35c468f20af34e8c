//! Identifier newtypes and the id-generation seam.
//!
//! Uniqueness is the only property the engine relies on. Production uses
//! random v4 ids; tests use [`SequentialIds`], which derives v5 ids from a
//! counter so runs are reproducible.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_newtype!(
    /// Catalog item identifier.
    ItemId
);

uuid_newtype!(
    /// Order identifier.
    OrderId
);

// ---------------------------------------------------------------------------
// IdSource
// ---------------------------------------------------------------------------

/// Supplies unique identifiers to the catalog and the ledger.
pub trait IdSource: Send + Sync {
    fn next_uuid(&self) -> Uuid;

    fn next_item_id(&self) -> ItemId {
        ItemId(self.next_uuid())
    }

    fn next_order_id(&self) -> OrderId {
        OrderId(self.next_uuid())
    }
}

/// Random v4 ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Deterministic ids: v5 over a fixed namespace and a monotonically
/// increasing counter. Two instances produce the same sequence.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

const SEQUENTIAL_NAMESPACE: Uuid = Uuid::from_u128(0x6d6b_7000_0000_4000_8000_0000_0000_0001);

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdSource for SequentialIds {
    fn next_uuid(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Uuid::new_v5(&SEQUENTIAL_NAMESPACE, &n.to_be_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_unique_and_reproducible() {
        let a = SequentialIds::new();
        let b = SequentialIds::new();
        let first: Vec<Uuid> = (0..4).map(|_| a.next_uuid()).collect();
        let second: Vec<Uuid> = (0..4).map(|_| b.next_uuid()).collect();
        assert_eq!(first, second);

        let mut dedup = first.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), first.len());
    }

    #[test]
    fn id_round_trips_through_display_and_from_str() {
        let id = RandomIds.next_order_id();
        let parsed: OrderId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<ItemId>().is_err());
    }
}
