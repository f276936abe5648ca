//! Checkout handoff
//!
//! Starting checkout freezes the cart into a separate session record that the
//! checkout flow reads. Completing the order clears both.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cart::CartStore,
    items::LineItem,
    pricing::OrderType,
    session::{SessionStore, StorageError},
};

/// Checkout errors.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout needs at least one item.
    #[error("your cart is empty; add items before checking out")]
    EmptyCart,

    /// The handoff record could not be encoded.
    #[error("failed to encode checkout record: {0}")]
    Encode(#[from] serde_json::Error),

    /// The handoff record could not be written.
    #[error("failed to save checkout record: {0}")]
    Storage(#[from] StorageError),
}

/// Cart frozen for the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutHandoff {
    /// Line items
    pub items: Vec<LineItem>,

    /// Sum of line totals
    pub subtotal: u64,

    /// Tax on the subtotal
    pub tax: u64,

    /// Delivery fee, zero for pickup
    pub delivery_fee: u64,

    /// Amount payable
    pub grand_total: u64,

    /// Delivery or pickup
    pub order_type: OrderType,

    /// When checkout started, epoch milliseconds
    pub timestamp: i64,
}

impl<S: SessionStore> CartStore<S> {
    /// Freeze the cart and write the checkout handoff record.
    ///
    /// The cart itself is left untouched until the order completes.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::EmptyCart`]: nothing to check out.
    /// - [`CheckoutError::Storage`]: the handoff record could not be written.
    #[tracing::instrument(
        name = "cart.begin_checkout",
        skip(self),
        fields(order_type = %self.order_type()),
        err
    )]
    pub fn begin_checkout(&self) -> Result<CheckoutHandoff, CheckoutError> {
        let snapshot = self.snapshot();

        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let handoff = CheckoutHandoff {
            subtotal: snapshot.totals.subtotal,
            tax: snapshot.totals.tax,
            delivery_fee: snapshot.totals.delivery_fee,
            grand_total: snapshot.totals.grand_total,
            order_type: snapshot.totals.order_type,
            timestamp: Timestamp::now().as_millisecond(),
            items: snapshot.items,
        };

        let json = serde_json::to_string(&handoff)?;

        self.session().set(&self.keys().checkout, &json)?;

        info!(
            grand_total = handoff.grand_total,
            lines = handoff.items.len(),
            "checkout started"
        );

        Ok(handoff)
    }

    /// Read back the handoff record written by [`CartStore::begin_checkout`].
    pub fn checkout_handoff(&self) -> Option<CheckoutHandoff> {
        let json = match self.session().get(&self.keys().checkout) {
            Ok(json) => json?,
            Err(error) => {
                warn!(%error, "failed to read checkout record");
                return None;
            }
        };

        serde_json::from_str(&json)
            .inspect_err(|error| warn!(%error, "ignoring malformed checkout record"))
            .ok()
    }

    /// The external checkout flow reported success: empty the cart and drop
    /// the handoff record.
    pub fn complete_order(&mut self) {
        self.clear();

        if let Err(error) = self.session().remove(&self.keys().checkout) {
            warn!(%error, "failed to delete checkout record");
        }

        info!("order completed");
    }
}
