//! Process-local persistence.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CredentialPersistence;
use crate::error::Result;
use crate::models::auth::RefreshToken;

/// Keeps the credential for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    slot: RwLock<Option<RefreshToken>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start out holding `token`, as if a previous run had saved it.
    pub fn with_token(token: RefreshToken) -> Self {
        Self {
            slot: RwLock::new(Some(token)),
        }
    }
}

#[async_trait]
impl CredentialPersistence for MemoryPersistence {
    async fn load(&self) -> Result<Option<RefreshToken>> {
        Ok(self.slot.read().await.clone())
    }

    async fn save(&self, token: &RefreshToken) -> Result<()> {
        *self.slot.write().await = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.slot.write().await = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_clear() {
        let slot = MemoryPersistence::new();
        assert!(slot.load().await.unwrap().is_none());

        slot.save(&RefreshToken::new("t1")).await.unwrap();
        slot.save(&RefreshToken::new("t2")).await.unwrap();
        assert_eq!(slot.load().await.unwrap(), Some(RefreshToken::new("t2")));

        slot.clear().await.unwrap();
        slot.clear().await.unwrap();
        assert!(slot.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seeded() {
        let slot = MemoryPersistence::with_token(RefreshToken::new("seed"));
        assert_eq!(slot.load().await.unwrap().unwrap().expose(), "seed");
    }
}
