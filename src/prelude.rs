//! Cravely prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{
        CartChange, CartCommand, CartSnapshot, CartState, CartStore, CartUpdate, StoreOptions,
    },
    checkout::{CheckoutError, CheckoutHandoff},
    items::LineItem,
    persistence::{CartPersistence, CartRecord, PersistenceError, StorageKeys},
    prices::{RateError, extract_price, parse_rate},
    pricing::{OrderTotals, OrderType, PricingConfig, TotalsDisplay},
    products::{Catalog, CatalogError, Product, RawProduct},
    receipt::{ReceiptError, write_receipt},
    session::{FileSessionStore, MemorySessionStore, SessionStore, StorageError},
    sync::{CardControl, CartViewModel, NotificationPopup, SyncOptions, ViewSynchronizer},
    timer::DeferredTimer,
};
