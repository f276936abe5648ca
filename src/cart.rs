//! Cart
//!
//! [`CartStore`] owns the order state for a session. Every mutation goes
//! through it; after each one the derived totals are recomputed, the cart is
//! saved to session storage and a [`CartUpdate`] is broadcast to the views.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    items::LineItem,
    persistence::{CartPersistence, StorageKeys},
    pricing::{OrderTotals, OrderType, PricingConfig},
    products::Product,
    session::SessionStore,
};

/// Default storage namespace.
pub const DEFAULT_NAMESPACE: &str = "cravely";

/// Line items plus their derived count and subtotal.
///
/// `count` and `total` are recomputed from `items` on every change and are
/// never stale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    items: Vec<LineItem>,
    count: u64,
    total: u64,
}

impl CartState {
    /// Build a state from line items, computing the derived values.
    ///
    /// Items are taken as given; callers are responsible for id uniqueness
    /// and non-zero quantities.
    pub fn from_items(items: Vec<LineItem>) -> Self {
        let mut state = Self {
            items,
            count: 0,
            total: 0,
        };

        state.refresh();

        state
    }

    /// Line items in display order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Total units across all lines.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Sum of `price * quantity` over all lines.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by product id.
    pub fn get(&self, id: &str) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Whether a product is in the cart.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    fn refresh(&mut self) {
        self.count = self
            .items
            .iter()
            .map(|item| u64::from(item.quantity))
            .fold(0, u64::saturating_add);

        self.total = self
            .items
            .iter()
            .map(LineItem::line_total)
            .fold(0, u64::saturating_add);
    }
}

/// Immutable view of the cart handed to views and checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Line items in display order
    pub items: Vec<LineItem>,

    /// Total units
    pub count: u64,

    /// Subtotal
    pub total: u64,

    /// Tax, fees and grand total under the current order type
    pub totals: OrderTotals,
}

impl CartSnapshot {
    /// Subtotal plus tax plus any delivery fee.
    pub fn grand_total(&self) -> u64 {
        self.totals.grand_total
    }

    /// Whether the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Quantity of a product in the cart, zero when absent.
    pub fn quantity_of(&self, id: &str) -> u32 {
        self.items
            .iter()
            .find(|item| item.id == id)
            .map_or(0, |item| item.quantity)
    }
}

/// What a mutation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CartChange {
    /// Cart state was rehydrated from the session, or started empty.
    Restored,

    /// Units were added; `quantity` is the line's new quantity.
    Added {
        /// Product id
        id: String,
        /// New line quantity
        quantity: u32,
    },

    /// A line went up by one.
    Incremented {
        /// Product id
        id: String,
        /// New line quantity
        quantity: u32,
    },

    /// A line went down by one; zero means the line was removed.
    Decremented {
        /// Product id
        id: String,
        /// New line quantity
        quantity: u32,
    },

    /// A line was deleted outright.
    Removed {
        /// Product id
        id: String,
    },

    /// Special instructions on a line were changed.
    Annotated {
        /// Product id
        id: String,
    },

    /// Every line was deleted.
    Cleared,

    /// The order type changed, which changes the grand total.
    OrderTypeChanged {
        /// New order type
        order_type: OrderType,
    },
}

impl CartChange {
    /// Whether the change only moved the quantity of an existing line.
    pub fn is_quantity_change(&self) -> bool {
        matches!(
            self,
            CartChange::Incremented { .. } | CartChange::Decremented { .. }
        )
    }
}

/// Broadcast after every effective mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartUpdate {
    /// What happened
    pub change: CartChange,

    /// Cart state after the change
    pub snapshot: CartSnapshot,
}

/// Inbound cart events from the views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    /// Product selected for add.
    Add {
        /// Product to add
        product: Product,
        /// Units to add; zero is treated as one
        quantity: u32,
    },

    /// Increment control activated for a product.
    Increment(String),

    /// Decrement control activated for a product.
    Decrement(String),

    /// Remove control activated for a line.
    Remove(String),

    /// Clear-cart control activated.
    Clear,
}

/// Settings for opening a [`CartStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Storage key namespace
    pub namespace: String,

    /// Tax and fee configuration
    pub pricing: PricingConfig,

    /// Order type used when neither the URL nor the session names one
    pub default_order_type: OrderType,

    /// Page URL query string, if any
    pub query: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            pricing: PricingConfig::default(),
            default_order_type: OrderType::default(),
            query: None,
        }
    }
}

/// The cart state machine.
#[derive(Debug)]
pub struct CartStore<S> {
    state: CartState,
    persistence: CartPersistence<S>,
    keys: StorageKeys,
    pricing: PricingConfig,
    order_type: OrderType,
    updates: watch::Sender<CartUpdate>,
}

impl<S: SessionStore> CartStore<S> {
    /// Open the cart for a session, rehydrating any saved cart.
    pub fn open(session: S, options: StoreOptions) -> Self {
        let keys = StorageKeys::new(&options.namespace);

        let order_type = OrderType::resolve(
            options.query.as_deref(),
            &session,
            &keys.order_type,
            options.default_order_type,
        );

        let persistence = CartPersistence::new(session, keys.cart.clone());
        let state = persistence.load().unwrap_or_default();

        debug!(
            namespace = %options.namespace,
            %order_type,
            count = state.count(),
            "opened cart"
        );

        let initial = CartUpdate {
            change: CartChange::Restored,
            snapshot: snapshot_of(&state, order_type, &options.pricing),
        };

        let (updates, _receiver) = watch::channel(initial);

        Self {
            state,
            persistence,
            keys,
            pricing: options.pricing,
            order_type,
            updates,
        }
    }

    /// Add units of a product. An existing line keeps its metadata and only
    /// gains quantity.
    pub fn add_item(&mut self, product: &Product, quantity: u32) {
        self.add_line(LineItem::from_product(product, quantity));
    }

    /// Add a prepared line. Its `quantity` is the number of units to add and
    /// is treated as one when zero.
    pub fn add_line(&mut self, mut line: LineItem) {
        let amount = line.quantity.max(1);
        let id = line.id.clone();

        let position = self.state.items.iter().position(|item| item.id == id);

        let quantity = match position.and_then(|position| self.state.items.get_mut(position)) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(amount);
                existing.quantity
            }
            None => {
                line.quantity = amount;
                self.state.items.push(line);
                amount
            }
        };

        debug!(%id, amount, quantity, "added to cart");

        self.commit(CartChange::Added { id, quantity });
    }

    /// Raise a line's quantity by one. Unknown ids are ignored.
    pub fn increment_quantity(&mut self, id: &str) {
        let Some(item) = self.state.get_mut(id) else {
            debug!(%id, "increment ignored for product not in cart");
            return;
        };

        item.quantity = item.quantity.saturating_add(1);

        let quantity = item.quantity;

        self.commit(CartChange::Incremented {
            id: id.to_string(),
            quantity,
        });
    }

    /// Lower a line's quantity by one, removing the line instead of leaving
    /// it at zero. Unknown ids are ignored.
    pub fn decrement_quantity(&mut self, id: &str) {
        let Some(item) = self.state.get_mut(id) else {
            debug!(%id, "decrement ignored for product not in cart");
            return;
        };

        let quantity = item.quantity.saturating_sub(1);

        if quantity == 0 {
            self.state.items.retain(|item| item.id != id);
        } else {
            item.quantity = quantity;
        }

        self.commit(CartChange::Decremented {
            id: id.to_string(),
            quantity,
        });
    }

    /// Delete a line. Unknown ids are ignored.
    pub fn remove_item(&mut self, id: &str) {
        if !self.state.contains(id) {
            debug!(%id, "remove ignored for product not in cart");
            return;
        }

        self.state.items.retain(|item| item.id != id);

        self.commit(CartChange::Removed { id: id.to_string() });
    }

    /// Replace a line's special instructions; blank text clears them.
    /// Unknown ids are ignored.
    pub fn set_special_instructions(&mut self, id: &str, instructions: Option<String>) {
        let Some(item) = self.state.get_mut(id) else {
            return;
        };

        item.special_instructions = instructions.filter(|text| !text.trim().is_empty());

        self.commit(CartChange::Annotated { id: id.to_string() });
    }

    /// Empty the cart and delete the saved record.
    pub fn clear(&mut self) {
        self.state = CartState::default();

        if let Err(error) = self.persistence.clear() {
            warn!(%error, "failed to delete saved cart; continuing in memory");
        }

        debug!("cleared cart");

        self.broadcast(CartChange::Cleared);
    }

    /// Change the order type and remember it for the session.
    pub fn set_order_type(&mut self, order_type: OrderType) {
        self.order_type = order_type;

        if let Err(error) = self
            .persistence
            .store()
            .set(&self.keys.order_type, order_type.as_str())
        {
            warn!(%error, "failed to save order type");
        }

        self.broadcast(CartChange::OrderTypeChanged { order_type });
    }

    /// Route an inbound view event to its operation.
    pub fn dispatch(&mut self, command: CartCommand) {
        match command {
            CartCommand::Add { product, quantity } => self.add_item(&product, quantity),
            CartCommand::Increment(id) => self.increment_quantity(&id),
            CartCommand::Decrement(id) => self.decrement_quantity(&id),
            CartCommand::Remove(id) => self.remove_item(&id),
            CartCommand::Clear => self.clear(),
        }
    }

    /// Current cart with totals under the current order type.
    pub fn snapshot(&self) -> CartSnapshot {
        snapshot_of(&self.state, self.order_type, &self.pricing)
    }

    /// Receive the latest [`CartUpdate`] after each mutation.
    pub fn subscribe(&self) -> watch::Receiver<CartUpdate> {
        self.updates.subscribe()
    }

    /// Current state.
    pub fn state(&self) -> &CartState {
        &self.state
    }

    /// Current order type.
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Pricing configuration.
    pub fn pricing(&self) -> &PricingConfig {
        &self.pricing
    }

    /// Storage keys in use.
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// The session store backing this cart.
    pub fn session(&self) -> &S {
        self.persistence.store()
    }

    /// Close the cart, handing back its session store.
    pub fn into_session(self) -> S {
        self.persistence.into_store()
    }

    fn commit(&mut self, change: CartChange) {
        self.state.refresh();

        // The in-memory cart stays authoritative when storage fails.
        if let Err(error) = self.persistence.save(&self.state) {
            warn!(%error, "failed to save cart; continuing in memory");
        }

        self.broadcast(change);
    }

    fn broadcast(&self, change: CartChange) {
        self.updates.send_replace(CartUpdate {
            change,
            snapshot: self.snapshot(),
        });
    }
}

fn snapshot_of(state: &CartState, order_type: OrderType, pricing: &PricingConfig) -> CartSnapshot {
    CartSnapshot {
        items: state.items.clone(),
        count: state.count,
        total: state.total,
        totals: OrderTotals::compute(state.total, order_type, pricing),
    }
}
