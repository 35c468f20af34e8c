//! Scenario: cart checkout and item deletion policy.
//!
//! # Invariants under test
//!
//! 1. Checkout places one independent order per line; a failing line does
//!    not roll back lines that succeeded.
//! 2. Outcomes come back in line order, each with its own result.
//! 3. `RejectPendingOrders` refuses to delete an item with pending orders
//!    (`ItemInUse`) and allows it once none are pending.
//! 4. `Permissive` deletes regardless.

use std::sync::Arc;

use mkp_catalog::CatalogStore;
use mkp_orders::{ItemDeletePolicy, LedgerSettings, LifecycleController, LifecyclePolicy, OrderLedger};
use mkp_schemas::{
    CartLine, Clock, Customer, EngineError, ErrorKind, IdSource, ItemId, Micros, NewItem,
    SequentialIds, SystemClock,
};

fn ledger() -> Arc<OrderLedger> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdSource> = Arc::new(SequentialIds::new());
    Arc::new(OrderLedger::new(
        Arc::new(CatalogStore::new(clock.clone(), ids.clone())),
        clock,
        ids,
        LedgerSettings::default(),
    ))
}

fn add_item(l: &OrderLedger, name: &str, stock: i64) -> ItemId {
    l.catalog()
        .add_item(NewItem {
            name: name.to_string(),
            price_micros: Micros::from_units(8).unwrap(),
            stock,
            discount_pct: 0,
            tags: vec![],
        })
        .unwrap()
        .item_id
}

fn customer() -> Customer {
    Customer {
        name: "Ana Ruiz".to_string(),
        phone: "555 444 3322".to_string(),
        delivery_address: "3 Birch Ct".to_string(),
    }
}

#[test]
fn checkout_is_per_line() {
    let l = ledger();
    let pens = add_item(&l, "Gel Pens", 10);
    let ink = add_item(&l, "Ink Pot", 1);
    let paper = add_item(&l, "A5 Paper", 4);

    let outcomes = l.checkout(
        &customer(),
        vec![
            CartLine { item_id: pens, quantity: 2 },
            CartLine { item_id: ink, quantity: 3 },
            CartLine { item_id: paper, quantity: 4 },
        ],
    );

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].line.item_id, pens);
    assert!(outcomes[0].result.is_ok());
    assert_eq!(
        outcomes[1].result,
        Err(EngineError::InsufficientStock {
            item_id: ink,
            requested: 3,
            available: 1
        })
    );
    assert!(outcomes[2].result.is_ok());

    assert_eq!(l.list_orders().unwrap().len(), 2);
    assert_eq!(l.catalog().get_item(pens).unwrap().stock, 8);
    assert_eq!(l.catalog().get_item(ink).unwrap().stock, 1);
    assert_eq!(l.catalog().get_item(paper).unwrap().stock, 0);
    assert_eq!(l.find_by_phone("5554443322").unwrap().len(), 2);
}

#[test]
fn empty_cart_places_nothing() {
    let l = ledger();
    assert!(l.checkout(&customer(), vec![]).is_empty());
    assert!(l.list_orders().unwrap().is_empty());
}

#[test]
fn reject_pending_orders_policy_guards_item_delete() {
    let l = ledger();
    let pens = add_item(&l, "Gel Pens", 10);
    let outcome = l.checkout(&customer(), vec![CartLine { item_id: pens, quantity: 1 }]);
    let order = outcome[0].result.clone().unwrap();

    let err = l.delete_item(pens, ItemDeletePolicy::RejectPendingOrders).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(
        err,
        EngineError::ItemInUse {
            item_id: pens,
            pending_orders: 1
        }
    );
    assert!(l.catalog().get_item(pens).is_ok());

    LifecycleController::new(l.clone(), LifecyclePolicy::ForwardOnly)
        .set_status(order.order_id, "shipped")
        .unwrap();
    l.delete_item(pens, ItemDeletePolicy::RejectPendingOrders).unwrap();
    assert_eq!(l.catalog().get_item(pens).unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn permissive_policy_deletes_regardless() {
    let l = ledger();
    let pens = add_item(&l, "Gel Pens", 10);
    l.checkout(&customer(), vec![CartLine { item_id: pens, quantity: 1 }]);

    l.delete_item(pens, ItemDeletePolicy::Permissive).unwrap();
    assert_eq!(l.list_orders().unwrap().len(), 1);
}
