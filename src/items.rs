//! Items

use serde::{Deserialize, Serialize};

use crate::products::Product;

/// A product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Product id, unique within a cart
    pub id: String,

    /// Display name
    pub name: String,

    /// Unit price in whole currency units
    pub price: u64,

    /// Pre-discount unit price
    #[serde(default)]
    pub original_price: u64,

    /// Image URL
    #[serde(default)]
    pub image: String,

    /// Display description
    #[serde(default)]
    pub description: String,

    /// Display grouping
    #[serde(default)]
    pub category: String,

    /// Units of this product in the cart, never zero while in a cart
    pub quantity: u32,

    /// Free-text instructions for the kitchen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

impl LineItem {
    /// Creates a line item for `quantity` units of a product.
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            original_price: product.original_price(),
            image: product.image.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            quantity,
            special_instructions: None,
        }
    }

    /// Attach special instructions, ignoring blank text.
    #[must_use]
    pub fn with_special_instructions(mut self, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();

        self.special_instructions = (!instructions.trim().is_empty()).then_some(instructions);

        self
    }

    /// Price of the whole line.
    pub fn line_total(&self) -> u64 {
        self.price.saturating_mul(u64::from(self.quantity))
    }

    /// Savings on the whole line against the original price.
    pub fn line_savings(&self) -> u64 {
        self.original_price
            .saturating_sub(self.price)
            .saturating_mul(u64::from(self.quantity))
    }
}
