//! The single-slot refresh credential store.

use std::sync::Arc;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::auth::RefreshToken;
use crate::storage::{CredentialPersistence, MemoryPersistence};

#[derive(Debug, Default)]
struct Slot {
    token: Option<RefreshToken>,
    /// Bumped on every store and eviction.
    generation: u64,
}

/// Owns the refresh credential for the signed-in identity.
///
/// The in-memory slot is authoritative; the persistence backend mirrors it
/// so the credential survives restarts. Every mutation bumps the generation.
/// The request pipeline uses it to notice a credential that changed while a
/// request was on the wire, and the refresh coordinator uses it to avoid
/// overwriting a login or logout that happened during an exchange.
pub struct CredentialStore {
    slot: RwLock<Slot>,
    persistence: Arc<dyn CredentialPersistence>,
}

impl CredentialStore {
    /// Open the store, reading any persisted credential.
    pub async fn open(persistence: Arc<dyn CredentialPersistence>) -> Result<Self> {
        let token = persistence.load().await?.filter(|t| !t.is_empty());
        if token.is_some() {
            info!(source = persistence.name(), "Loaded refresh credential from storage");
        }
        Ok(Self {
            slot: RwLock::new(Slot {
                token,
                generation: 0,
            }),
            persistence,
        })
    }

    /// An empty store backed by memory only.
    pub fn in_memory() -> Self {
        Self {
            slot: RwLock::new(Slot::default()),
            persistence: Arc::new(MemoryPersistence::new()),
        }
    }

    /// The current credential, if any.
    pub async fn current(&self) -> Option<RefreshToken> {
        self.slot.read().await.token.clone()
    }

    /// The current generation and credential, read atomically.
    pub async fn snapshot(&self) -> (u64, Option<RefreshToken>) {
        let slot = self.slot.read().await;
        (slot.generation, slot.token.clone())
    }

    pub async fn generation(&self) -> u64 {
        self.slot.read().await.generation
    }

    pub async fn is_signed_in(&self) -> bool {
        self.slot.read().await.token.is_some()
    }

    /// Replace the credential after a login and persist it.
    ///
    /// The in-memory value is updated even when persistence fails; the error
    /// is still returned so callers can surface it.
    pub async fn store(&self, token: RefreshToken) -> Result<u64> {
        let slot = self.slot.write().await;
        self.replace(slot, token).await
    }

    /// Store `token` only if the generation is still `expected`.
    ///
    /// `Ok(None)` means the slot moved on and nothing was written.
    pub async fn store_if(&self, expected: u64, token: RefreshToken) -> Result<Option<u64>> {
        let slot = self.slot.write().await;
        if slot.generation != expected {
            debug!(expected, generation = slot.generation, "Credential superseded, not storing");
            return Ok(None);
        }
        self.replace(slot, token).await.map(Some)
    }

    /// Drop the credential from memory and storage.
    ///
    /// Returns `false` if the slot was already empty, in which case nothing
    /// changes.
    pub async fn evict(&self) -> Result<bool> {
        let slot = self.slot.write().await;
        if slot.token.is_none() {
            return Ok(false);
        }
        self.clear(slot).await.map(|()| true)
    }

    /// Evict only if the generation is still `expected` and a credential is
    /// held. Returns whether the eviction happened.
    pub async fn evict_if(&self, expected: u64) -> Result<bool> {
        let slot = self.slot.write().await;
        if slot.generation != expected || slot.token.is_none() {
            debug!(expected, generation = slot.generation, "Credential superseded, not evicting");
            return Ok(false);
        }
        self.clear(slot).await.map(|()| true)
    }

    pub fn storage_name(&self) -> &str {
        self.persistence.name()
    }

    async fn replace(&self, mut slot: RwLockWriteGuard<'_, Slot>, token: RefreshToken) -> Result<u64> {
        let persisted = self.persistence.save(&token).await;
        slot.token = Some(token);
        slot.generation += 1;
        debug!(generation = slot.generation, "Refresh credential stored");
        if let Err(e) = &persisted {
            warn!(source = self.persistence.name(), "Failed to persist refresh credential: {}", e);
        }
        persisted.map(|()| slot.generation)
    }

    async fn clear(&self, mut slot: RwLockWriteGuard<'_, Slot>) -> Result<()> {
        slot.token = None;
        slot.generation += 1;
        debug!(generation = slot.generation, "Refresh credential evicted");
        self.persistence.clear().await
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("storage", &self.persistence.name())
            .finish()
    }
}
