//! Cravely
//!
//! Cart core for the Cravely food-ordering storefront: the in-memory cart
//! state machine, its session persistence, order pricing and the view
//! synchronisation contract.

pub mod cart;
pub mod checkout;
pub mod items;
pub mod persistence;
pub mod prelude;
pub mod prices;
pub mod pricing;
pub mod products;
pub mod receipt;
pub mod session;
pub mod sync;
pub mod timer;
