//! End-to-end cart scenarios against the demo menu and a file-backed session.
//!
//! Each test opens the store the way a page load does, mutates it through the
//! inbound commands, and reopens it to simulate a reload within the session.

use cravely::prelude::*;
use testresult::TestResult;

const MENU_YAML: &str = include_str!("../fixtures/menu.yml");

fn product(id: &str, price: u64) -> Product {
    Product {
        id: id.to_string(),
        name: id.to_uppercase(),
        price,
        original_price: None,
        image: String::new(),
        description: String::new(),
        category: String::new(),
    }
}

fn add(id: &str, price: u64) -> CartCommand {
    CartCommand::Add {
        product: product(id, price),
        quantity: 1,
    }
}

#[test]
fn adding_twice_merges_into_one_line() {
    let mut store = CartStore::open(MemorySessionStore::new(), StoreOptions::default());

    store.dispatch(add("p1", 500));
    store.dispatch(add("p1", 500));

    let snapshot = store.snapshot();

    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.quantity_of("p1"), 2);
    assert_eq!(snapshot.total, 1000);
    assert_eq!(snapshot.count, 2);
}

#[test]
fn decrementing_the_last_unit_empties_the_cart() {
    let mut store = CartStore::open(MemorySessionStore::new(), StoreOptions::default());

    store.dispatch(add("p1", 500));
    store.dispatch(CartCommand::Decrement("p1".to_string()));

    let snapshot = store.snapshot();

    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.count, 0);
    assert_eq!(snapshot.total, 0);
}

#[test]
fn delivery_and_pickup_grand_totals() {
    let mut store = CartStore::open(MemorySessionStore::new(), StoreOptions::default());

    store.dispatch(add("p1", 500));
    store.dispatch(add("p2", 300));

    let delivery = store.snapshot().totals;

    assert_eq!(delivery.subtotal, 800);
    assert_eq!(delivery.tax, 120);
    assert_eq!(delivery.grand_total, 1120);

    store.set_order_type(OrderType::Pickup);

    assert_eq!(store.snapshot().grand_total(), 920);
}

#[test]
fn reload_recovers_the_cart() -> TestResult {
    let dir = tempfile::tempdir()?;
    let session_dir = dir.path().join("session");

    let before = {
        let mut store =
            CartStore::open(FileSessionStore::new(&session_dir), StoreOptions::default());

        store.dispatch(add("p1", 500));
        store.dispatch(add("p2", 300));
        store.dispatch(add("p2", 300));

        store.snapshot()
    };

    let reloaded = CartStore::open(FileSessionStore::new(&session_dir), StoreOptions::default());
    let after = reloaded.snapshot();

    assert_eq!(after.items, before.items);
    assert_eq!(after.count, 3);
    assert_eq!(after.total, 1100);

    Ok(())
}

#[test]
fn removing_a_missing_line_changes_nothing() {
    let mut store = CartStore::open(MemorySessionStore::new(), StoreOptions::default());

    store.dispatch(add("p1", 500));

    let before = store.snapshot();

    store.dispatch(CartCommand::Remove("nonexistent".to_string()));

    assert_eq!(store.snapshot(), before);
}

#[test]
fn corrupt_session_record_starts_an_empty_cart() -> TestResult {
    let dir = tempfile::tempdir()?;
    let session = FileSessionStore::new(dir.path());

    session.set("cravely-cart-data", "][")?;

    let store = CartStore::open(session, StoreOptions::default());

    assert!(store.snapshot().is_empty());
    assert_eq!(store.session().get("cravely-cart-data")?, None);

    Ok(())
}

#[test]
fn ended_session_forgets_the_cart() -> TestResult {
    let dir = tempfile::tempdir()?;
    let session_dir = dir.path().join("visit");

    let mut store = CartStore::open(FileSessionStore::new(&session_dir), StoreOptions::default());

    store.dispatch(add("p1", 500));
    store.session().purge()?;

    let next_visit = CartStore::open(FileSessionStore::new(&session_dir), StoreOptions::default());

    assert!(next_visit.snapshot().is_empty());

    Ok(())
}

#[test]
fn menu_to_checkout_to_completion() -> TestResult {
    let catalog = Catalog::from_yaml(MENU_YAML)?;
    let mut store = CartStore::open(
        MemorySessionStore::new(),
        StoreOptions {
            query: Some("?type=pickup".to_string()),
            ..StoreOptions::default()
        },
    );

    for id in ["chicken-biryani", "masala-fries", "chicken-biryani"] {
        if let Some(product) = catalog.get(id) {
            store.add_item(product, 1);
        }
    }

    store.set_special_instructions("chicken-biryani", Some("extra raita".to_string()));

    let handoff = store.begin_checkout()?;

    assert_eq!(handoff.order_type, OrderType::Pickup);
    assert_eq!(handoff.subtotal, 1300);
    assert_eq!(handoff.tax, 195);
    assert_eq!(handoff.grand_total, 1495);
    assert_eq!(
        handoff
            .items
            .first()
            .and_then(|item| item.special_instructions.as_deref()),
        Some("extra raita")
    );

    store.complete_order();

    assert!(store.snapshot().is_empty());
    assert!(matches!(store.begin_checkout(), Err(CheckoutError::EmptyCart)));

    Ok(())
}

#[test]
fn scraped_markup_degrades_to_zero_price() {
    let mut store = CartStore::open(MemorySessionStore::new(), StoreOptions::default());

    let scraped = Product::from(RawProduct {
        name: Some("Mystery Platter".to_string()),
        price: Some("Market price".to_string()),
        ..RawProduct::default()
    });

    store.add_item(&scraped, 1);

    let snapshot = store.snapshot();

    assert_eq!(snapshot.count, 1);
    assert_eq!(snapshot.total, 0);
    assert!(
        snapshot
            .items
            .first()
            .is_some_and(|item| item.id.starts_with("item-"))
    );
}
