//! Products
//!
//! The catalog is loaded once from a typed source and queried by id. Untyped
//! data scraped from markup goes through [`RawProduct`], which degrades
//! gracefully instead of failing.

use std::{fs, path::Path};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::prices::extract_price;

/// Catalog loading errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// IO error reading the catalog file
    #[error("failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("failed to parse catalog YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// Two catalog entries share an id
    #[error("duplicate product id in catalog: {0}")]
    DuplicateId(String),
}

/// A product on the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Product id
    pub id: String,

    /// Display name
    pub name: String,

    /// Unit price in whole currency units
    pub price: u64,

    /// Pre-discount price
    #[serde(default)]
    pub original_price: Option<u64>,

    /// Image URL
    #[serde(default)]
    pub image: String,

    /// Display description
    #[serde(default)]
    pub description: String,

    /// Display grouping
    #[serde(default)]
    pub category: String,
}

impl Product {
    /// Pre-discount price, falling back to the current price.
    pub fn original_price(&self) -> u64 {
        self.original_price.unwrap_or(self.price)
    }
}

/// Product data as scraped from rendered markup, where any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    /// Product id attribute
    pub id: Option<String>,

    /// Name text
    pub name: Option<String>,

    /// Formatted price text, e.g. `"Rs. 1,250"`
    pub price: Option<String>,

    /// Formatted original price text
    pub original_price: Option<String>,

    /// Image source
    pub image: Option<String>,

    /// Description text
    pub description: Option<String>,

    /// Category attribute
    pub category: Option<String>,
}

impl From<RawProduct> for Product {
    fn from(raw: RawProduct) -> Self {
        let id = raw
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(placeholder_id);

        let price = extract_price(raw.price.as_deref());

        let original_price = raw
            .original_price
            .as_deref()
            .map(|text| extract_price(Some(text)))
            .filter(|value| *value > 0)
            .or(Some(price));

        Product {
            id,
            name: raw.name.unwrap_or_default().trim().to_string(),
            price,
            original_price,
            image: raw.image.unwrap_or_default(),
            description: raw.description.unwrap_or_default().trim().to_string(),
            category: raw.category.unwrap_or_default(),
        }
    }
}

fn placeholder_id() -> String {
    let id = format!("item-{}", Uuid::now_v7().simple());

    debug!(%id, "generated placeholder product id");

    id
}

/// Wrapper for products in YAML
#[derive(Debug, Deserialize)]
struct CatalogFixture {
    products: Vec<Product>,
}

/// The menu, in display order, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: FxHashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from products in display order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateId`] if two products share an id.
    pub fn new(products: impl Into<Vec<Product>>) -> Result<Self, CatalogError> {
        let products = products.into();
        let mut index = FxHashMap::default();

        for (position, product) in products.iter().enumerate() {
            if index.insert(product.id.clone(), position).is_some() {
                return Err(CatalogError::DuplicateId(product.id.clone()));
            }
        }

        Ok(Self { products, index })
    }

    /// Parse a catalog from a YAML document with a top-level `products` list.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or ids are duplicated.
    pub fn from_yaml(contents: &str) -> Result<Self, CatalogError> {
        let fixture: CatalogFixture = serde_norway::from_str(contents)?;

        Self::new(fixture.products)
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml(&contents)
    }

    /// Look up a product by id.
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.index
            .get(id)
            .and_then(|position| self.products.get(*position))
    }

    /// Iterate products in display order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Number of products.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products.
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
