//! Credential file on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::CredentialPersistence;
use crate::error::{Error, Result};
use crate::models::auth::RefreshToken;

/// On-disk shape: `{"refreshToken": "..."}`, the same key the server uses.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
    refresh_token: RefreshToken,
}

/// Stores the refresh credential in a JSON file readable only by its owner.
///
/// Clearing removes the file.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/folio-client/credentials.json` or the platform equivalent.
    pub fn default_path() -> Result<Self> {
        Ok(Self::new(crate::config::default_storage_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_restricted(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::storage_io(parent, e.to_string()))?;
        }
        std::fs::write(&self.path, content).map_err(|e| Error::storage_io(&self.path, e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| Error::storage_io(&self.path, format!("chmod: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialPersistence for FilePersistence {
    async fn load(&self) -> Result<Option<RefreshToken>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::storage_io(&self.path, e.to_string())),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let file: CredentialFile =
            serde_json::from_str(&content).map_err(|e| Error::StorageSerialization(e.to_string()))?;
        Ok(Some(file.refresh_token))
    }

    async fn save(&self, token: &RefreshToken) -> Result<()> {
        let content = serde_json::to_string_pretty(&CredentialFile {
            refresh_token: token.clone(),
        })
        .map_err(|e| Error::StorageSerialization(e.to_string()))?;
        self.write_restricted(&content)?;
        debug!(path = %self.path.display(), "Credential file written");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "Credential file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage_io(&self.path, e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_survives_reopen_and_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FilePersistence::new(dir.path().join("nested").join("credentials.json"));
        assert!(slot.load().await.unwrap().is_none());

        slot.save(&RefreshToken::new("t1")).await.unwrap();
        let reopened = FilePersistence::new(slot.path());
        assert_eq!(reopened.load().await.unwrap(), Some(RefreshToken::new("t1")));

        reopened.clear().await.unwrap();
        assert!(!slot.path().exists());
        reopened.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_holds_only_the_credential() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FilePersistence::new(dir.path().join("credentials.json"));
        slot.save(&RefreshToken::new("t1")).await.unwrap();

        let on_disk: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(slot.path()).unwrap()).unwrap();
        assert_eq!(on_disk, serde_json::json!({ "refreshToken": "t1" }));
    }

    #[tokio::test]
    async fn test_blank_file_is_empty_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "  \n").unwrap();

        assert!(FilePersistence::new(&path).load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            FilePersistence::new(&path).load().await,
            Err(Error::StorageSerialization(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let slot = FilePersistence::new(dir.path().join("credentials.json"));
        slot.save(&RefreshToken::new("t1")).await.unwrap();

        let mode = std::fs::metadata(slot.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
