pub mod auth;
pub mod holdings;
