//! System keyring persistence (feature-gated).

use async_trait::async_trait;
use tracing::debug;

use super::CredentialPersistence;
use crate::config::REFRESH_TOKEN_KEY;
use crate::error::{Error, Result};
use crate::models::auth::RefreshToken;

const SERVICE_NAME: &str = "folio-client";

/// Keeps the credential in the Secret Service, Keychain or Credential Manager.
///
/// The entry is `folio-client` / `refreshToken`, holding the raw token.
#[derive(Debug, Default)]
pub struct KeyringPersistence;

impl KeyringPersistence {
    pub fn new() -> Self {
        Self
    }

    fn entry() -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE_NAME, REFRESH_TOKEN_KEY).map_err(|e| Error::Keyring(e.to_string()))
    }
}

#[async_trait]
impl CredentialPersistence for KeyringPersistence {
    async fn load(&self) -> Result<Option<RefreshToken>> {
        match Self::entry()?.get_password() {
            Ok(secret) => Ok(Some(RefreshToken::new(secret))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Keyring(e.to_string())),
        }
    }

    async fn save(&self, token: &RefreshToken) -> Result<()> {
        Self::entry()?
            .set_password(token.expose())
            .map_err(|e| Error::Keyring(e.to_string()))?;
        debug!("Credential saved to keyring");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Keyring(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "keyring"
    }
}
