//! Receipt
//!
//! Terminal rendering of a cart snapshot.

use std::io;

use rusty_money::iso::Currency;
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::{cart::CartSnapshot, pricing::format_amount};

/// Receipt output errors.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// Writing to the output failed.
    #[error("failed to write receipt: {0}")]
    Io(#[from] io::Error),
}

/// Write the cart as a table followed by its totals.
///
/// # Errors
///
/// Returns an error if the output cannot be written.
pub fn write_receipt(
    mut out: impl io::Write,
    snapshot: &CartSnapshot,
    currency: &'static Currency,
) -> Result<(), ReceiptError> {
    if snapshot.is_empty() {
        writeln!(out, "Your cart is empty.")?;
        return Ok(());
    }

    let mut builder = Builder::default();

    builder.push_record(["", "Item", "Qty", "Price", "Line Total", "Notes"]);

    for (idx, item) in snapshot.items.iter().enumerate() {
        builder.push_record([
            format!("#{:<3}", idx + 1),
            item.name.clone(),
            item.quantity.to_string(),
            format_amount(item.price, currency),
            format_amount(item.line_total(), currency),
            item.special_instructions.clone().unwrap_or_default(),
        ]);
    }

    let mut table = builder.build();

    let mut theme = Theme::from(Style::modern_rounded());

    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(
        1,
        HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
    );

    table.with(theme);
    table.modify(Columns::new(2..5), Alignment::right());
    table.modify(Rows::first(), Alignment::center());

    writeln!(out, "\n{table}")?;

    let display = snapshot.totals.display(currency);

    let mut rows = vec![
        ("Subtotal:", display.subtotal),
        ("Tax:", display.tax),
    ];

    if let Some(fee) = display.delivery_fee {
        rows.push(("Delivery fee:", fee));
    }

    rows.push(("Total:", display.grand_total));

    let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let value_width = rows.iter().map(|(_, value)| value.chars().count()).max().unwrap_or(0);

    for (label, value) in rows {
        writeln!(out, " {label:<label_width$} {value:>value_width$}")?;
    }

    writeln!(
        out,
        " {} item(s), {}",
        snapshot.count,
        snapshot.totals.order_type
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rusty_money::iso;
    use testresult::TestResult;

    use crate::{
        cart::{CartStore, StoreOptions},
        items::LineItem,
        pricing::OrderType,
        products::Product,
        session::MemorySessionStore,
    };

    use super::*;

    fn product(id: &str, name: &str, price: u64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            price,
            original_price: None,
            image: String::new(),
            description: String::new(),
            category: String::new(),
        }
    }

    #[test]
    fn renders_lines_and_delivery_totals() -> TestResult {
        let mut store = CartStore::open(MemorySessionStore::new(), StoreOptions::default());

        store.add_item(&product("p1", "Zinger Burger", 500), 1);
        store.add_line(
            LineItem::from_product(&product("p2", "Masala Fries", 300), 1)
                .with_special_instructions("extra dip"),
        );

        let mut out = Vec::new();
        write_receipt(&mut out, &store.snapshot(), iso::PKR)?;

        let output = String::from_utf8(out)?;

        assert!(output.contains("Zinger Burger"));
        assert!(output.contains("Masala Fries"));
        assert!(output.contains("extra dip"));
        assert!(output.contains("Subtotal:"));
        assert!(output.contains("Delivery fee:"));
        assert!(output.contains("1,120"));
        assert!(output.contains("2 item(s), delivery"));

        Ok(())
    }

    #[test]
    fn pickup_omits_delivery_fee() -> TestResult {
        let mut store = CartStore::open(MemorySessionStore::new(), StoreOptions::default());

        store.add_item(&product("p1", "Zinger Burger", 800), 1);
        store.set_order_type(OrderType::Pickup);

        let mut out = Vec::new();
        write_receipt(&mut out, &store.snapshot(), iso::PKR)?;

        let output = String::from_utf8(out)?;

        assert!(!output.contains("Delivery fee:"));
        assert!(output.contains("920"));

        Ok(())
    }

    #[test]
    fn empty_cart_prints_a_notice() -> TestResult {
        let store = CartStore::open(MemorySessionStore::new(), StoreOptions::default());

        let mut out = Vec::new();
        write_receipt(&mut out, &store.snapshot(), iso::PKR)?;

        assert_eq!(String::from_utf8(out)?, "Your cart is empty.\n");

        Ok(())
    }
}
