//! # folio-client
//!
//! Rust client for the Folio portfolio API with transparent session renewal.
//!
//! A request that comes back 401 is renewed through the refresh-token
//! exchange and replayed once. Concurrent expirations share one exchange.
//! The `GET /Auth/get-user` bootstrap check never triggers a refresh, and a
//! failed renewal evicts the stored credential and sends the user to the
//! login route unless they are already on a public surface.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use folio_client::{FolioClientBuilder, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = FolioClientBuilder::new().build().await?;
//!
//!     match client.auth().current_user().await? {
//!         Some(user) => println!("signed in as {}", user.user_name),
//!         None => println!("not signed in"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `keyring` - Enable system keyring token storage

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod storage;
pub mod transport;

pub use client::{FolioClient, FolioClientBuilder};
pub use config::ClientConfig;
pub use error::{Error, RefreshError, Result};
pub use models::auth::{
    ConfirmEmailRequest, LoginRequest, RefreshToken, RegisterRequest, ResetPasswordRequest,
    UserProfile,
};
pub use models::holdings::{Holding, HoldingDraft};
