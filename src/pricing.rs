//! Pricing
//!
//! Order type resolution and the subtotal to grand total calculation.

use std::{fmt, str::FromStr};

use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use rusty_money::{
    Money,
    iso::{self, Currency},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::session::SessionStore;

/// Query parameter names that carry the order type, in priority order.
const ORDER_TYPE_PARAMS: [&str; 2] = ["type", "orderType"];

/// Unrecognised order type string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown order type: {0}")]
pub struct UnknownOrderType(pub String);

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Delivered to an address; a delivery fee applies.
    #[default]
    Delivery,

    /// Collected from the restaurant.
    Pickup,
}

impl OrderType {
    /// Lowercase name as used in URLs and storage.
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::Delivery => "delivery",
            OrderType::Pickup => "pickup",
        }
    }

    /// Resolve the order type for this page.
    ///
    /// Looks at the URL query string first, then the session record under
    /// `session_key`, then falls back to `default`. Unrecognised values and
    /// unreadable storage fall through to the next source.
    pub fn resolve(
        query: Option<&str>,
        session: &impl SessionStore,
        session_key: &str,
        default: OrderType,
    ) -> OrderType {
        if let Some(order_type) = query.and_then(order_type_from_query) {
            return order_type;
        }

        match session.get(session_key) {
            Ok(Some(value)) => {
                if let Ok(order_type) = value.parse() {
                    return order_type;
                }
            }
            Ok(None) => {}
            Err(error) => warn!(%error, "failed to read order type from session storage"),
        }

        default
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = UnknownOrderType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delivery" => Ok(OrderType::Delivery),
            "pickup" | "takeaway" => Ok(OrderType::Pickup),
            _ => Err(UnknownOrderType(s.to_string())),
        }
    }
}

fn order_type_from_query(query: &str) -> Option<OrderType> {
    let pairs: Vec<(&str, &str)> = query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();

    ORDER_TYPE_PARAMS.iter().find_map(|param| {
        pairs
            .iter()
            .filter(|(name, _)| name == param)
            .find_map(|(_, value)| value.parse().ok())
    })
}

/// Fixed pricing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    /// Fraction of the subtotal charged as tax
    pub tax_rate: Decimal,

    /// Flat fee for delivery orders
    pub delivery_fee: u64,

    /// Display currency
    pub currency: &'static Currency,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(15, 2),
            delivery_fee: 200,
            currency: iso::PKR,
        }
    }
}

/// Order totals for a subtotal under an order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    /// Sum of line totals
    pub subtotal: u64,

    /// Rounded tax on the subtotal
    pub tax: u64,

    /// Delivery fee, zero for pickup
    pub delivery_fee: u64,

    /// Subtotal plus tax plus any delivery fee
    pub grand_total: u64,

    /// Order type the totals were computed for
    pub order_type: OrderType,
}

impl OrderTotals {
    /// Compute totals for `subtotal`.
    pub fn compute(subtotal: u64, order_type: OrderType, config: &PricingConfig) -> Self {
        let tax = tax_on(subtotal, config.tax_rate);

        let delivery_fee = match order_type {
            OrderType::Delivery => config.delivery_fee,
            OrderType::Pickup => 0,
        };

        Self {
            subtotal,
            tax,
            delivery_fee,
            grand_total: subtotal.saturating_add(tax).saturating_add(delivery_fee),
            order_type,
        }
    }

    /// Currency-formatted strings for display.
    pub fn display(&self, currency: &'static Currency) -> TotalsDisplay {
        TotalsDisplay {
            subtotal: format_amount(self.subtotal, currency),
            tax: format_amount(self.tax, currency),
            delivery_fee: match self.order_type {
                OrderType::Delivery => Some(format_amount(self.delivery_fee, currency)),
                OrderType::Pickup => None,
            },
            grand_total: format_amount(self.grand_total, currency),
        }
    }
}

/// Formatted totals. The delivery fee is absent for pickup orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsDisplay {
    /// Formatted subtotal
    pub subtotal: String,

    /// Formatted tax
    pub tax: String,

    /// Formatted delivery fee
    pub delivery_fee: Option<String>,

    /// Formatted grand total
    pub grand_total: String,
}

/// Tax on `subtotal`, rounded half away from zero to a whole amount.
pub fn tax_on(subtotal: u64, rate: Decimal) -> u64 {
    Decimal::from(subtotal)
        .checked_mul(rate)
        .map(|tax| tax.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|tax| tax.to_u64())
        .unwrap_or(u64::MAX)
}

/// Format a whole-unit amount in `currency`.
pub fn format_amount(amount: u64, currency: &'static Currency) -> String {
    let money = Money::from_major(i64::try_from(amount).unwrap_or(i64::MAX), currency);

    format!("{money}")
}
