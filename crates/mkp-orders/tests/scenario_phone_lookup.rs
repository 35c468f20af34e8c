//! Scenario: orders are found by customer phone.
//!
//! # Invariants under test
//!
//! 1. `find_by_phone` returns exactly the orders placed with that phone, in
//!    placement order, whatever formatting the query uses.
//! 2. An unused phone, or input with no digits, returns an empty list.
//! 3. Deleting an order removes it from lookups; other orders stay.

use std::sync::Arc;

use mkp_catalog::CatalogStore;
use mkp_orders::{LedgerSettings, OrderLedger};
use mkp_schemas::{
    Clock, IdSource, ItemId, Micros, NewItem, NewOrder, OrderId, SequentialIds, SystemClock,
};

fn ledger() -> OrderLedger {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ids: Arc<dyn IdSource> = Arc::new(SequentialIds::new());
    OrderLedger::new(
        Arc::new(CatalogStore::new(clock.clone(), ids.clone())),
        clock,
        ids,
        LedgerSettings::default(),
    )
}

fn add_item(l: &OrderLedger, name: &str) -> ItemId {
    l.catalog()
        .add_item(NewItem {
            name: name.to_string(),
            price_micros: Micros::from_units(12).unwrap(),
            stock: 50,
            discount_pct: 0,
            tags: vec![],
        })
        .unwrap()
        .item_id
}

fn place(l: &OrderLedger, item_id: ItemId, phone: &str) -> OrderId {
    l.place_order(NewOrder {
        item_id,
        quantity: 1,
        customer_name: "Sam Lee".to_string(),
        customer_phone: phone.to_string(),
        delivery_address: "1 Main St".to_string(),
    })
    .unwrap()
    .order_id
}

fn ids(orders: Vec<mkp_schemas::Order>) -> Vec<OrderId> {
    orders.into_iter().map(|o| o.order_id).collect()
}

#[test]
fn lookup_returns_exactly_matching_orders() {
    let l = ledger();
    let soap = add_item(&l, "Olive Soap");
    let towel = add_item(&l, "Bath Towel");

    let a1 = place(&l, soap, "555-867-5309");
    let b1 = place(&l, soap, "5550001234");
    let a2 = place(&l, towel, "(555) 867 5309");

    assert_eq!(ids(l.find_by_phone("5558675309").unwrap()), vec![a1, a2]);
    assert_eq!(ids(l.find_by_phone("555.867.5309").unwrap()), vec![a1, a2]);
    assert_eq!(ids(l.find_by_phone("555-000-1234").unwrap()), vec![b1]);

    for o in l.find_by_phone("5558675309").unwrap() {
        assert_eq!(o.customer_phone, "5558675309");
    }
}

#[test]
fn unused_or_digitless_phone_is_empty() {
    let l = ledger();
    let soap = add_item(&l, "Olive Soap");
    place(&l, soap, "5558675309");

    assert!(l.find_by_phone("5559999999").unwrap().is_empty());
    assert!(l.find_by_phone("").unwrap().is_empty());
    assert!(l.find_by_phone("call me").unwrap().is_empty());
}

#[test]
fn deleted_orders_drop_out_of_lookup() {
    let l = ledger();
    let soap = add_item(&l, "Olive Soap");
    let a1 = place(&l, soap, "5558675309");
    let a2 = place(&l, soap, "5558675309");

    l.delete_order(a1).unwrap();
    assert_eq!(ids(l.find_by_phone("5558675309").unwrap()), vec![a2]);
}
