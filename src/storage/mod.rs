//! Where the refresh credential lives between runs.
//!
//! There is exactly one credential per client, so a backend is a single
//! slot: [`CredentialPersistence::load`], [`CredentialPersistence::save`]
//! and [`CredentialPersistence::clear`].
//!
//! - [`FilePersistence`] - JSON document with 0600 permissions
//! - [`MemoryPersistence`] - process lifetime only
//! - [`KeyringPersistence`] - system keyring (feature-gated)

mod file;
mod memory;

#[cfg(feature = "keyring")]
mod keyring;

use async_trait::async_trait;

pub use file::FilePersistence;
pub use memory::MemoryPersistence;

#[cfg(feature = "keyring")]
pub use keyring::KeyringPersistence;

use crate::error::Result;
use crate::models::auth::RefreshToken;

/// A single persisted credential slot.
#[async_trait]
pub trait CredentialPersistence: Send + Sync {
    /// The persisted credential, if one was saved.
    async fn load(&self) -> Result<Option<RefreshToken>>;

    /// Replace the persisted credential.
    async fn save(&self, token: &RefreshToken) -> Result<()>;

    /// Forget the persisted credential. Clearing an empty slot is not an error.
    async fn clear(&self) -> Result<()>;

    /// Backend name, for logs.
    fn name(&self) -> &str;
}
