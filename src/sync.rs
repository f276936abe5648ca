//! View synchronisation
//!
//! Turns [`CartUpdate`]s into the state each UI surface renders: the cart
//! badge, the sidebar line list, the add/stepper control on every product
//! card, the popular-items suggestions and the "added to cart" popup.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use rustc_hash::{FxHashMap, FxHashSet};
use rusty_money::iso::Currency;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    cart::{CartChange, CartSnapshot, CartUpdate},
    pricing::{TotalsDisplay, format_amount},
    products::{Catalog, Product},
    timer::DeferredTimer,
};

/// Default number of popular items suggested.
pub const DEFAULT_POPULAR_LIMIT: usize = 4;

/// Default time the "added to cart" popup stays up.
pub const DEFAULT_NOTIFICATION_DELAY: Duration = Duration::from_millis(3_000);

/// Control shown on a product card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardControl {
    /// Product not in cart: show "add to cart".
    AddButton,

    /// Product in cart: show a quantity stepper.
    Stepper {
        /// Quantity in cart
        quantity: u32,
    },
}

/// Cart badge in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeView {
    /// Units in cart
    pub count: u64,

    /// Formatted subtotal
    pub price: String,
}

/// One line in the cart sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineView {
    /// Product id
    pub id: String,

    /// Display name
    pub name: String,

    /// Units
    pub quantity: u32,

    /// Formatted unit price
    pub unit_price: String,

    /// Formatted line total
    pub line_total: String,

    /// Special instructions, if any
    pub special_instructions: Option<String>,
}

/// Everything the views render for one cart state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartViewModel {
    /// Header badge
    pub badge: BadgeView,

    /// Sidebar lines
    pub lines: Vec<LineView>,

    /// Formatted totals
    pub totals: TotalsDisplay,

    /// Control per catalog product id
    pub cards: FxHashMap<String, CardControl>,

    /// Suggested products not in the cart
    pub popular: Vec<Product>,

    /// Whether the sidebar shows its empty state
    pub empty: bool,
}

/// Settings for [`ViewSynchronizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Popular items to suggest
    pub popular_limit: usize,

    /// How long the popup stays visible
    pub notification_delay: Duration,

    /// Also show the popup when only a quantity changed
    pub popup_on_quantity_change: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            popular_limit: DEFAULT_POPULAR_LIMIT,
            notification_delay: DEFAULT_NOTIFICATION_DELAY,
            popup_on_quantity_change: false,
        }
    }
}

/// Pick up to `limit` random catalog products that are not in the cart.
///
/// When the catalog is empty the built-in fallback set is used instead.
pub fn popular_items<R: Rng + ?Sized>(
    catalog: &Catalog,
    cart: &CartSnapshot,
    limit: usize,
    rng: &mut R,
) -> Vec<Product> {
    let in_cart: FxHashSet<&str> = cart.items.iter().map(|item| item.id.as_str()).collect();

    let mut candidates: Vec<Product> = if catalog.is_empty() {
        fallback_products()
    } else {
        catalog.iter().cloned().collect()
    };

    candidates.retain(|product| !in_cart.contains(product.id.as_str()));
    candidates.shuffle(rng);
    candidates.truncate(limit);

    candidates
}

/// Suggestions used when no catalog has been loaded.
pub fn fallback_products() -> Vec<Product> {
    [
        ("fallback-zinger", "Zinger Burger", 650, "burgers"),
        ("fallback-fries", "Masala Fries", 350, "sides"),
        ("fallback-wings", "Hot Wings (6 pcs)", 590, "sides"),
        ("fallback-shake", "Chocolate Shake", 450, "drinks"),
        ("fallback-brownie", "Fudge Brownie", 300, "desserts"),
    ]
    .into_iter()
    .map(|(id, name, price, category)| Product {
        id: id.to_string(),
        name: name.to_string(),
        price,
        original_price: None,
        image: String::new(),
        description: String::new(),
        category: category.to_string(),
    })
    .collect()
}

/// The "added to cart" popup with its auto-hide timer.
#[derive(Debug)]
pub struct NotificationPopup {
    visible: Arc<AtomicBool>,
    message: Option<String>,
    timer: DeferredTimer,
}

impl NotificationPopup {
    /// A hidden popup that auto-hides `delay` after each show.
    pub fn new(delay: Duration) -> Self {
        Self {
            visible: Arc::new(AtomicBool::new(false)),
            message: None,
            timer: DeferredTimer::new(delay),
        }
    }

    /// Show `message`, restarting the auto-hide countdown.
    pub fn show(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
        self.visible.store(true, Ordering::SeqCst);

        let visible = Arc::clone(&self.visible);

        self.timer.schedule(move || visible.store(false, Ordering::SeqCst));
    }

    /// Hide immediately.
    pub fn hide(&mut self) {
        self.timer.cancel();
        self.visible.store(false, Ordering::SeqCst);
    }

    /// Whether the popup is showing.
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Last message shown.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Keeps every cart surface in step with the cart.
#[derive(Debug)]
pub struct ViewSynchronizer {
    catalog: Arc<Catalog>,
    currency: &'static Currency,
    options: SyncOptions,
    popup: NotificationPopup,
    rng: StdRng,
    view: Option<CartViewModel>,
}

impl ViewSynchronizer {
    /// Synchronise views for products in `catalog`.
    pub fn new(catalog: Arc<Catalog>, currency: &'static Currency, options: SyncOptions) -> Self {
        Self::with_rng(catalog, currency, options, StdRng::from_entropy())
    }

    /// As [`ViewSynchronizer::new`] with a fixed random source.
    pub fn with_rng(
        catalog: Arc<Catalog>,
        currency: &'static Currency,
        options: SyncOptions,
        rng: StdRng,
    ) -> Self {
        Self {
            catalog,
            currency,
            options,
            popup: NotificationPopup::new(options.notification_delay),
            rng,
            view: None,
        }
    }

    /// Re-render from an update.
    pub fn apply(&mut self, update: &CartUpdate) -> &CartViewModel {
        if self.should_show_popup(&update.change) {
            let message = self.popup_message(update);
            self.popup.show(message);
        }

        let view = self.render(&update.snapshot);

        debug!(
            count = view.badge.count,
            lines = view.lines.len(),
            "synchronised cart views"
        );

        self.view.insert(view)
    }

    /// Apply every update until the cart store goes away.
    pub async fn follow(&mut self, mut updates: watch::Receiver<CartUpdate>) {
        let current = updates.borrow_and_update().clone();
        self.apply(&current);

        while updates.changed().await.is_ok() {
            let update = updates.borrow_and_update().clone();
            self.apply(&update);
        }
    }

    /// Last rendered view.
    pub fn view(&self) -> Option<&CartViewModel> {
        self.view.as_ref()
    }

    /// The popup.
    pub fn popup(&self) -> &NotificationPopup {
        &self.popup
    }

    /// Mutable access to the popup, e.g. for a close button.
    pub fn popup_mut(&mut self) -> &mut NotificationPopup {
        &mut self.popup
    }

    fn should_show_popup(&self, change: &CartChange) -> bool {
        match change {
            CartChange::Added { .. } => true,
            CartChange::Incremented { .. } => self.options.popup_on_quantity_change,
            CartChange::Decremented { quantity, .. } => {
                self.options.popup_on_quantity_change && *quantity > 0
            }
            _ => false,
        }
    }

    fn popup_message(&self, update: &CartUpdate) -> String {
        let id = match &update.change {
            CartChange::Added { id, .. }
            | CartChange::Incremented { id, .. }
            | CartChange::Decremented { id, .. } => id.as_str(),
            _ => "",
        };

        let name = self
            .catalog
            .get(id)
            .map(|product| product.name.as_str())
            .or_else(|| {
                update
                    .snapshot
                    .items
                    .iter()
                    .find(|item| item.id == id)
                    .map(|item| item.name.as_str())
            })
            .unwrap_or("Item");

        format!("{name} added to cart")
    }

    fn render(&mut self, snapshot: &CartSnapshot) -> CartViewModel {
        let lines = snapshot
            .items
            .iter()
            .map(|item| LineView {
                id: item.id.clone(),
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: format_amount(item.price, self.currency),
                line_total: format_amount(item.line_total(), self.currency),
                special_instructions: item.special_instructions.clone(),
            })
            .collect();

        let cards = self
            .catalog
            .iter()
            .map(|product| {
                let control = match snapshot.quantity_of(&product.id) {
                    0 => CardControl::AddButton,
                    quantity => CardControl::Stepper { quantity },
                };

                (product.id.clone(), control)
            })
            .collect();

        let popular = popular_items(
            &self.catalog,
            snapshot,
            self.options.popular_limit,
            &mut self.rng,
        );

        CartViewModel {
            badge: BadgeView {
                count: snapshot.count,
                price: format_amount(snapshot.total, self.currency),
            },
            lines,
            totals: snapshot.totals.display(self.currency),
            cards,
            popular,
            empty: snapshot.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{
        cart::{CartStore, StoreOptions},
        session::MemorySessionStore,
    };

    use super::*;

    const MENU: &str = r"
products:
  - {id: zinger, name: Zinger Burger, price: 650}
  - {id: fries, name: Loaded Fries, price: 450}
  - {id: shake, name: Mango Shake, price: 400}
  - {id: wrap, name: Chicken Wrap, price: 550}
  - {id: wings, name: Hot Wings, price: 590}
";

    fn catalog() -> Result<Arc<Catalog>, crate::products::CatalogError> {
        Ok(Arc::new(Catalog::from_yaml(MENU)?))
    }

    fn synchronizer(catalog: Arc<Catalog>, options: SyncOptions) -> ViewSynchronizer {
        ViewSynchronizer::with_rng(catalog, iso::PKR, options, StdRng::seed_from_u64(7))
    }

    fn open_store() -> CartStore<MemorySessionStore> {
        CartStore::open(MemorySessionStore::new(), StoreOptions::default())
    }

    #[test]
    fn popular_items_exclude_cart_and_respect_limit() -> TestResult {
        let catalog = catalog()?;
        let mut store = open_store();

        if let Some(zinger) = catalog.get("zinger") {
            store.add_item(zinger, 1);
        }

        let mut rng = StdRng::seed_from_u64(1);
        let picks = popular_items(&catalog, &store.snapshot(), 3, &mut rng);

        assert_eq!(picks.len(), 3);
        assert!(picks.iter().all(|p| p.id != "zinger"));

        let everything = popular_items(&catalog, &store.snapshot(), 10, &mut rng);

        assert_eq!(everything.len(), 4);

        Ok(())
    }

    #[test]
    fn popular_items_fall_back_when_catalog_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        let picks = popular_items(&Catalog::default(), &open_store().snapshot(), 4, &mut rng);

        assert_eq!(picks.len(), 4);
        assert!(picks.iter().all(|p| p.id.starts_with("fallback-")));
    }

    #[test]
    fn fallback_excludes_cart_items_too() {
        let mut store = open_store();
        let fallback = fallback_products();

        for product in &fallback {
            store.add_item(product, 1);
        }

        let mut rng = StdRng::seed_from_u64(1);

        assert!(popular_items(&Catalog::default(), &store.snapshot(), 4, &mut rng).is_empty());
    }

    #[test]
    fn apply_renders_badge_lines_and_cards() -> TestResult {
        let catalog = catalog()?;
        let mut store = open_store();
        let mut sync = synchronizer(Arc::clone(&catalog), SyncOptions::default());

        if let Some(fries) = catalog.get("fries") {
            store.add_item(fries, 2);
        }

        let view = sync.apply(&store.subscribe().borrow()).clone();

        assert_eq!(view.badge.count, 2);
        assert!(view.badge.price.contains("900"));
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines.first().map(|l| l.quantity), Some(2));
        assert_eq!(
            view.cards.get("fries"),
            Some(&CardControl::Stepper { quantity: 2 })
        );
        assert_eq!(view.cards.get("zinger"), Some(&CardControl::AddButton));
        assert!(view.popular.iter().all(|p| p.id != "fries"));
        assert!(!view.empty);
        assert!(view.totals.delivery_fee.is_some());

        Ok(())
    }

    #[test]
    fn empty_cart_renders_empty_state() -> TestResult {
        let mut sync = synchronizer(catalog()?, SyncOptions::default());

        let view = sync.apply(&open_store().subscribe().borrow()).clone();

        assert!(view.empty);
        assert_eq!(view.badge.count, 0);
        assert!(view.cards.values().all(|c| *c == CardControl::AddButton));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn popup_shows_on_add_and_auto_hides() -> TestResult {
        let catalog = catalog()?;
        let mut store = open_store();
        let mut sync = synchronizer(Arc::clone(&catalog), SyncOptions::default());

        if let Some(zinger) = catalog.get("zinger") {
            store.add_item(zinger, 1);
        }

        let update = store.subscribe().borrow().clone();
        sync.apply(&update);

        assert!(sync.popup().is_visible());
        assert_eq!(sync.popup().message(), Some("Zinger Burger added to cart"));

        tokio::time::sleep(Duration::from_millis(3_100)).await;

        assert!(!sync.popup().is_visible());

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn popup_names_products_missing_from_the_catalog() -> TestResult {
        let mut store = open_store();
        let mut sync = synchronizer(catalog()?, SyncOptions::default());

        let scraped = Product::from(crate::products::RawProduct {
            name: Some("Mystery Platter".to_string()),
            price: Some("Rs. 800".to_string()),
            ..crate::products::RawProduct::default()
        });

        store.add_item(&scraped, 1);

        let update = store.subscribe().borrow().clone();
        sync.apply(&update);

        assert_eq!(sync.popup().message(), Some("Mystery Platter added to cart"));

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn second_add_restarts_the_popup_timer() -> TestResult {
        let catalog = catalog()?;
        let mut store = open_store();
        let mut sync = synchronizer(Arc::clone(&catalog), SyncOptions::default());

        if let Some(zinger) = catalog.get("zinger") {
            store.add_item(zinger, 1);
        }
        let first = store.subscribe().borrow().clone();
        sync.apply(&first);

        tokio::time::sleep(Duration::from_secs(2)).await;

        if let Some(fries) = catalog.get("fries") {
            store.add_item(fries, 1);
        }
        let second = store.subscribe().borrow().clone();
        sync.apply(&second);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(sync.popup().is_visible(), "first hide must have been cancelled");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!sync.popup().is_visible());

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn quantity_changes_follow_popup_policy() -> TestResult {
        let catalog = catalog()?;
        let mut store = open_store();

        if let Some(zinger) = catalog.get("zinger") {
            store.add_item(zinger, 1);
        }
        store.increment_quantity("zinger");

        let update = store.subscribe().borrow().clone();

        let mut quiet = synchronizer(Arc::clone(&catalog), SyncOptions::default());
        quiet.apply(&update);

        let mut chatty = synchronizer(
            Arc::clone(&catalog),
            SyncOptions {
                popup_on_quantity_change: true,
                ..SyncOptions::default()
            },
        );
        chatty.apply(&update);

        assert!(!quiet.popup().is_visible());
        assert!(chatty.popup().is_visible());

        chatty.popup_mut().hide();

        assert!(!chatty.popup().is_visible());

        Ok(())
    }

    #[tokio::test]
    async fn follow_tracks_store_updates() -> TestResult {
        let catalog = catalog()?;
        let mut store = open_store();
        let updates = store.subscribe();

        let handle = tokio::spawn({
            let catalog = Arc::clone(&catalog);
            async move {
                let mut sync = ViewSynchronizer::with_rng(
                    catalog,
                    iso::PKR,
                    SyncOptions::default(),
                    StdRng::seed_from_u64(3),
                );
                sync.follow(updates).await;
                sync.view().map(|view| view.badge.count)
            }
        });

        if let Some(wrap) = catalog.get("wrap") {
            store.add_item(wrap, 3);
        }
        drop(store);

        assert_eq!(handle.await?, Some(3));

        Ok(())
    }
}
