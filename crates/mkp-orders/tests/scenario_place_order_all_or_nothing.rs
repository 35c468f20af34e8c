//! Scenario: `place_order` is all-or-nothing.
//!
//! # Invariants under test
//!
//! 1. Every rejected placement leaves stock, the order list and the phone
//!    index exactly as they were.
//! 2. Many threads placing orders against one item never oversell it, and
//!    the ledger holds exactly one order per successful placement.
//! 3. Successful placements carry `Pending` status and the configured
//!    delivery estimate.

use std::sync::Arc;
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use mkp_catalog::CatalogStore;
use mkp_orders::{DeliveryEstimates, LedgerSettings, OrderLedger};
use mkp_schemas::{
    Clock, EngineError, ErrorKind, IdSource, ItemId, ManualClock, Micros, NewItem, NewOrder,
    OrderStatus, SequentialIds,
};

fn ledger(clock: Arc<dyn Clock>) -> Arc<OrderLedger> {
    let ids: Arc<dyn IdSource> = Arc::new(SequentialIds::new());
    let catalog = Arc::new(CatalogStore::new(clock.clone(), ids.clone()));
    Arc::new(OrderLedger::new(
        catalog,
        clock,
        ids,
        LedgerSettings {
            phone_digits: 10,
            delivery: DeliveryEstimates {
                pending_hours: 3,
                shipped_hours: 2,
            },
        },
    ))
}

fn add_item(l: &OrderLedger, stock: i64) -> ItemId {
    l.catalog()
        .add_item(NewItem {
            name: "Ceramic Teapot".to_string(),
            price_micros: Micros::from_units(50).unwrap(),
            stock,
            discount_pct: 0,
            tags: vec!["kitchen".to_string()],
        })
        .unwrap()
        .item_id
}

fn order(item_id: ItemId, quantity: i64, phone: &str) -> NewOrder {
    NewOrder {
        item_id,
        quantity,
        customer_name: "Priya Natarajan".to_string(),
        customer_phone: phone.to_string(),
        delivery_address: "221 Lake View Rd".to_string(),
    }
}

#[test]
fn rejected_placements_change_nothing() {
    let clock = Arc::new(ManualClock::at(Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()));
    let l = ledger(clock);
    let item = add_item(&l, 3);

    let cases: Vec<(NewOrder, ErrorKind)> = vec![
        (order(item, 5, "5550001111"), ErrorKind::InsufficientStock),
        (order(item, 0, "5550001111"), ErrorKind::Validation),
        (order(item, -2, "5550001111"), ErrorKind::Validation),
        (order(item, 1, "555-0001"), ErrorKind::Validation),
        (order(item, 1, "no digits"), ErrorKind::Validation),
        (
            NewOrder {
                customer_name: "   ".to_string(),
                ..order(item, 1, "5550001111")
            },
            ErrorKind::Validation,
        ),
        (
            NewOrder {
                delivery_address: String::new(),
                ..order(item, 1, "5550001111")
            },
            ErrorKind::Validation,
        ),
    ];

    for (input, expected) in cases {
        let err = l.place_order(input.clone()).unwrap_err();
        assert_eq!(err.kind(), expected, "input {input:?} gave {err}");
    }

    let unknown: ItemId = "0d0c1f6e-9a2b-4c55-8e3f-1f2e3d4c5b6a".parse().unwrap();
    assert_eq!(
        l.place_order(order(unknown, 1, "5550001111")).unwrap_err().kind(),
        ErrorKind::NotFound
    );

    assert_eq!(l.catalog().get_item(item).unwrap().stock, 3);
    assert!(l.list_orders().unwrap().is_empty());
    assert!(l.find_by_phone("5550001111").unwrap().is_empty());
}

#[test]
fn insufficient_stock_reports_requested_and_available() {
    let l = ledger(Arc::new(ManualClock::at(Utc::now())));
    let item = add_item(&l, 3);

    let err = l.place_order(order(item, 5, "5550001111")).unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientStock {
            item_id: item,
            requested: 5,
            available: 3
        }
    );
}

#[test]
fn successful_placement_is_pending_with_estimate() {
    let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
    let l = ledger(Arc::new(ManualClock::at(t0)));
    let item = add_item(&l, 3);

    let o = l.place_order(order(item, 2, "(555) 000-1111")).unwrap();
    assert_eq!(o.status, OrderStatus::Pending);
    assert_eq!(o.created_at_utc, t0);
    assert_eq!(o.estimated_delivery_utc, t0 + Duration::hours(3));
    assert_eq!(o.charged_total_micros, Micros::from_units(100).unwrap());
    assert_eq!(l.catalog().get_item(item).unwrap().stock, 1);
    assert_eq!(l.get_order(o.order_id).unwrap(), o);
}

#[test]
fn concurrent_placements_never_oversell() {
    let l = ledger(Arc::new(ManualClock::at(Utc::now())));
    let item = add_item(&l, 25);

    let placed: usize = thread::scope(|scope| {
        let handles: Vec<_> = (0..10)
            .map(|t| {
                let l = &l;
                scope.spawn(move || {
                    let phone = format!("55500000{t:02}");
                    (0..10)
                        .filter(|_| match l.place_order(order(item, 1, &phone)) {
                            Ok(_) => true,
                            Err(EngineError::InsufficientStock { .. }) => false,
                            Err(e) => panic!("unexpected: {e}"),
                        })
                        .count()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(placed, 25);
    assert_eq!(l.list_orders().unwrap().len(), 25);
    assert_eq!(l.catalog().get_item(item).unwrap().stock, 0);
}
