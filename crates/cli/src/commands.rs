//! Cart commands
//!
//! Every command opens the cart from the session directory, applies one event
//! and prints the resulting receipt, the way a page reload would re-render.

use std::{io::Write, sync::Arc};

use clap::{Args, Subcommand};
use cravely::{
    cart::{CartCommand, CartStore, CartUpdate},
    checkout::CheckoutError,
    pricing::{OrderType, format_amount},
    products::{Catalog, Product},
    receipt::write_receipt,
    session::FileSessionStore,
    sync::{SyncOptions, ViewSynchronizer, fallback_products},
};
use rusty_money::iso::Currency;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::StoreConfig;

/// Cart commands.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// List the menu
    Menu,

    /// Add a product to the cart
    Add(AddArgs),

    /// Add one more of a line
    Increment {
        /// Product id
        id: String,
    },

    /// Take one away from a line, removing it at zero
    Decrement {
        /// Product id
        id: String,
    },

    /// Remove a line
    Remove {
        /// Product id
        id: String,
    },

    /// Set or clear the special instructions on a line
    Note {
        /// Product id
        id: String,

        /// Instructions; omit to clear
        text: Option<String>,
    },

    /// Empty the cart
    Clear,

    /// Print the cart
    Show,

    /// Switch between delivery and pickup
    OrderType {
        /// delivery or pickup
        order_type: OrderType,
    },

    /// Suggest products that are not in the cart yet
    Popular,

    /// Hand the cart over to checkout
    Checkout,

    /// Mark the checked-out order as placed
    Complete,

    /// End the browsing session, forgetting the cart
    EndSession,
}

/// Arguments for `add`.
#[derive(Debug, Args)]
pub(crate) struct AddArgs {
    /// Product id
    id: String,

    /// Units to add
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,

    /// Special instructions for the line
    #[arg(long)]
    note: Option<String>,
}

/// Run `command` against the session cart, writing output to `out`.
pub(crate) fn run(
    config: &StoreConfig,
    command: Command,
    out: &mut impl Write,
) -> Result<(), String> {
    let catalog = Arc::new(load_catalog(config)?);
    let session = FileSessionStore::new(&config.session_dir);
    let mut store = CartStore::open(session, config.store_options());
    let currency = store.pricing().currency;

    let mut views = ViewSynchronizer::new(
        Arc::clone(&catalog),
        currency,
        SyncOptions {
            popular_limit: config.popular_limit,
            ..SyncOptions::default()
        },
    );

    let updates = store.subscribe();

    debug!(?command, "running cart command");

    match command {
        Command::Menu => return write_menu(out, &catalog, currency),
        Command::Add(args) => {
            let product = catalog
                .get(&args.id)
                .ok_or_else(|| format!("unknown product: {}", args.id))?;

            let existing = store.state().contains(&args.id);

            store.add_item(product, args.quantity);
            sync_views(&mut views, &updates);

            // Re-adding keeps the line's metadata, instructions included.
            if existing {
                if args.note.is_some() {
                    warn!(id = %args.id, "note ignored for a line already in the cart");
                }
            } else if args.note.is_some() {
                store.set_special_instructions(&args.id, args.note);
            }
        }
        Command::Increment { id } => store.dispatch(CartCommand::Increment(id)),
        Command::Decrement { id } => store.dispatch(CartCommand::Decrement(id)),
        Command::Remove { id } => store.dispatch(CartCommand::Remove(id)),
        Command::Note { id, text } => store.set_special_instructions(&id, text),
        Command::Clear => store.dispatch(CartCommand::Clear),
        Command::Show => {}
        Command::OrderType { order_type } => store.set_order_type(order_type),
        Command::Popular => {
            sync_views(&mut views, &updates);

            let popular = views.view().map(|view| view.popular.as_slice());

            return write_popular(out, popular.unwrap_or_default(), currency);
        }
        Command::Checkout => return checkout(out, &store),
        Command::Complete => {
            if store.checkout_handoff().is_none() {
                return Err("no checkout in progress; run `cravely checkout` first".to_string());
            }

            store.complete_order();

            writeln!(out, "Order placed. Thank you!").map_err(write_error)?;

            return Ok(());
        }
        Command::EndSession => {
            store
                .session()
                .purge()
                .map_err(|error| format!("failed to end session: {error}"))?;

            writeln!(out, "Session ended.").map_err(write_error)?;

            return Ok(());
        }
    }

    if let Some(message) = views.popup().is_visible().then(|| views.popup().message()).flatten() {
        writeln!(out, "{message}").map_err(write_error)?;
    }

    write_receipt(out, &store.snapshot(), currency).map_err(|error| error.to_string())
}

fn load_catalog(config: &StoreConfig) -> Result<Catalog, String> {
    match &config.catalog {
        Some(path) => Catalog::load(path)
            .map_err(|error| format!("failed to load catalog {}: {error}", path.display())),
        None => Catalog::new(fallback_products()).map_err(|error| error.to_string()),
    }
}

fn sync_views(views: &mut ViewSynchronizer, updates: &watch::Receiver<CartUpdate>) {
    let update = updates.borrow().clone();

    views.apply(&update);
}

fn checkout(out: &mut impl Write, store: &CartStore<FileSessionStore>) -> Result<(), String> {
    let currency = store.pricing().currency;

    match store.begin_checkout() {
        Ok(handoff) => {
            write_receipt(&mut *out, &store.snapshot(), currency)
                .map_err(|error| error.to_string())?;

            writeln!(
                out,
                "Checkout started for {}. Run `cravely complete` once payment succeeds.",
                format_amount(handoff.grand_total, currency)
            )
            .map_err(write_error)
        }
        Err(CheckoutError::EmptyCart) => Err(
            "Your cart is empty. Add something from `cravely menu` before checking out."
                .to_string(),
        ),
        Err(error) => Err(error.to_string()),
    }
}

fn write_menu(
    out: &mut impl Write,
    catalog: &Catalog,
    currency: &'static Currency,
) -> Result<(), String> {
    for product in catalog.iter() {
        let was = if product.original_price() > product.price {
            format!(" (was {})", format_amount(product.original_price(), currency))
        } else {
            String::new()
        };

        writeln!(
            out,
            "{:<20} {:<24} {}{was}",
            product.id,
            product.name,
            format_amount(product.price, currency)
        )
        .map_err(write_error)?;
    }

    Ok(())
}

fn write_popular(
    out: &mut impl Write,
    popular: &[Product],
    currency: &'static Currency,
) -> Result<(), String> {
    if popular.is_empty() {
        return writeln!(out, "You already have everything on the menu.").map_err(write_error);
    }

    writeln!(out, "You might also like:").map_err(write_error)?;

    for product in popular {
        writeln!(
            out,
            "  {:<20} {:<24} {}",
            product.id,
            product.name,
            format_amount(product.price, currency)
        )
        .map_err(write_error)?;
    }

    Ok(())
}

fn write_error(error: std::io::Error) -> String {
    format!("failed to write output: {error}")
}
