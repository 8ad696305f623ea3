//! Error types for folio-client.

use std::path::PathBuf;
use thiserror::Error;

/// Why a refresh exchange did not produce a new session.
///
/// `Clone` so a single outcome can be handed to every caller waiting on the
/// same in-flight exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// The auth server answered with a non-success status.
    #[error("refresh rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// The request never got a response.
    #[error("refresh request failed: {0}")]
    Network(String),

    /// The exchange exceeded the refresh timeout.
    #[error("refresh timed out")]
    Timeout,

    /// A 2xx response without a usable `refreshToken`.
    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    /// The task driving the exchange went away before finishing.
    #[error("refresh task aborted")]
    Aborted,
}

/// The main error type for folio-client.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ──────────────────────────────────────────────────────────────
    /// No refresh credential is stored.
    #[error("Not authenticated - log in first")]
    NotAuthenticated,

    /// The session expired and could not be renewed.
    #[error("Session could not be renewed: {0}")]
    RefreshFailed(#[from] RefreshError),

    // ── API ──────────────────────────────────────────────────────────────────
    /// API returned an error response.
    #[error("API error {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// A 2xx response whose body is missing a required field.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ── Storage ──────────────────────────────────────────────────────────────
    /// Storage I/O error.
    #[error("Storage I/O error at {path}: {message}")]
    StorageIo {
        /// Path that caused the error.
        path: PathBuf,
        /// Error description.
        message: String,
    },

    /// Storage serialization error.
    #[error("Storage serialization error: {0}")]
    StorageSerialization(String),

    /// Keyring backend error.
    #[error("Keyring error: {0}")]
    Keyring(String),

    // ── Infrastructure ───────────────────────────────────────────────────────
    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request timeout.
    #[error("Request timed out")]
    Timeout,
}

impl Error {
    /// HTTP status carried by an API failure.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for a transport-level 401.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns true if the caller has to log in again before retrying.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Error::NotAuthenticated | Error::RefreshFailed(_) | Error::Api { status: 401, .. }
        )
    }

    /// Returns true if a session existed but could not be renewed.
    ///
    /// A plain 401 means there was never a usable session to begin with.
    #[must_use]
    pub fn is_session_lost(&self) -> bool {
        matches!(self, Error::RefreshFailed(_))
    }

    /// Creates a storage I/O error.
    #[must_use]
    pub fn storage_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::StorageIo {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience type alias.
pub type Result<T> = std::result::Result<T, Error>;
