//! Cart persistence
//!
//! Saves the cart to session storage so it survives reloads within a visit.
//! Corrupt records are treated as "no saved cart" and deleted.

use jiff::Timestamp;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    cart::CartState,
    items::LineItem,
    session::{SessionStore, StorageError},
};

/// Session storage keys for one storefront namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Cart record key
    pub cart: String,

    /// Checkout handoff record key
    pub checkout: String,

    /// Chosen order type key
    pub order_type: String,
}

impl StorageKeys {
    /// Keys under `namespace`, e.g. `cravely-cart-data`.
    pub fn new(namespace: &str) -> Self {
        Self {
            cart: format!("{namespace}-cart-data"),
            checkout: format!("{namespace}-checkout-data"),
            order_type: format!("{namespace}-order-type"),
        }
    }
}

/// Errors writing the cart record.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// The record could not be encoded.
    #[error("failed to encode cart record: {0}")]
    Encode(#[from] serde_json::Error),

    /// Session storage rejected the operation.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Cart record as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartRecord {
    /// Line items in display order
    pub items: Vec<LineItem>,

    /// Subtotal at save time
    #[serde(default)]
    pub total: u64,

    /// Unit count at save time
    #[serde(default)]
    pub count: u64,

    /// Save time in epoch milliseconds
    #[serde(default)]
    pub timestamp: i64,
}

/// Persistence adapter for the cart record.
#[derive(Debug)]
pub struct CartPersistence<S> {
    store: S,
    key: String,
}

impl<S: SessionStore> CartPersistence<S> {
    /// Persist under `key` in `store`.
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The underlying session store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give up the adapter, returning the session store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Record key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Write the cart record, stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or storage rejects the write.
    pub fn save(&self, state: &CartState) -> Result<(), PersistenceError> {
        let record = CartRecord {
            items: state.items().to_vec(),
            total: state.total(),
            count: state.count(),
            timestamp: Timestamp::now().as_millisecond(),
        };

        let json = serde_json::to_string(&record)?;

        self.store.set(&self.key, &json)?;

        debug!(key = %self.key, count = record.count, "saved cart");

        Ok(())
    }

    /// Read the saved cart, if there is a usable one.
    ///
    /// Missing, unreadable and malformed records all yield `None`. Malformed
    /// records are deleted so the next save starts clean. Valid records are
    /// normalised: empty lines are dropped, repeated ids are merged, and
    /// totals are recomputed from the items.
    pub fn load(&self) -> Option<CartState> {
        let json = match self.store.get(&self.key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(error) => {
                warn!(%error, key = %self.key, "failed to read saved cart");
                return None;
            }
        };

        match serde_json::from_str::<CartRecord>(&json) {
            Ok(record) => Some(CartState::from_items(normalise(record.items))),
            Err(error) => {
                warn!(%error, key = %self.key, "discarding corrupt saved cart");

                if let Err(error) = self.store.remove(&self.key) {
                    warn!(%error, key = %self.key, "failed to delete corrupt saved cart");
                }

                None
            }
        }
    }

    /// Delete the saved cart.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be modified.
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.store.remove(&self.key)?;

        Ok(())
    }
}

fn normalise(items: Vec<LineItem>) -> Vec<LineItem> {
    let mut merged: Vec<LineItem> = Vec::with_capacity(items.len());
    let mut positions: FxHashMap<String, usize> = FxHashMap::default();

    for item in items.into_iter().filter(|item| item.quantity > 0) {
        match positions.get(&item.id).copied() {
            Some(position) => {
                if let Some(existing) = merged.get_mut(position) {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
            }
            None => {
                positions.insert(item.id.clone(), merged.len());
                merged.push(item);
            }
        }
    }

    merged
}
