//! Typed endpoints of the Folio API.
//!
//! Every call here goes through the session pipeline except logout, which
//! is sent over the bare transport so a dead session cannot trigger a
//! refresh on the way out.

pub mod auth;
pub mod coins;
pub mod holdings;

pub use auth::AuthApi;
pub use coins::CoinsApi;
pub use holdings::HoldingsApi;
