//! Client configuration: protocol constants plus a TOML file with `FOLIO_*`
//! environment overrides.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:4200/api";

/// Storage key for the refresh credential.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Refresh exchange endpoint.
pub const REFRESH_PATH: &str = "/Auth/refresh-token";

/// Identity bootstrap endpoint.
pub const GET_USER_PATH: &str = "/Auth/get-user";

pub const LOGIN_PATH: &str = "/Auth/login";
pub const LOGOUT_PATH: &str = "/Auth/logout";
pub const REGISTER_PATH: &str = "/Auth/register";
pub const CONFIRM_EMAIL_PATH: &str = "/Auth/confirm-email";
pub const FORGOT_PASSWORD_PATH: &str = "/Auth/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/Auth/reset-password";
pub const HOLDINGS_PATH: &str = "/Holdings";
pub const COINS_PATH: &str = "/Coins";

/// Login surface of the web app.
pub const LOGIN_ROUTE: &str = "/login";

/// Registration surface of the web app.
pub const REGISTER_ROUTE: &str = "/register";

/// Default user agent.
pub const USER_AGENT: &str = concat!("folio-client/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound for one refresh exchange.
pub const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which settings were overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Check whether a setting key (e.g. "api.base_url") is overridden.
    pub fn is_overridden(&self, key: &str) -> bool {
        self.overrides.contains_key(key)
    }

    /// Get the env var name that overrides the given setting key.
    pub fn env_var_for(&self, key: &str) -> Option<&str> {
        self.overrides.get(key).map(String::as_str)
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            refresh_timeout_secs: default_refresh_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Where the user agent is sent after an unrecoverable session failure.
    #[serde(default = "default_login_route")]
    pub login_path: String,
    /// Surfaces that never trigger a redirect.
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
    #[serde(default)]
    pub storage: StorageBackend,
    /// Credentials file for the `file` backend.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_path: default_login_route(),
            public_paths: default_public_paths(),
            storage: StorageBackend::default(),
            storage_path: None,
        }
    }
}

/// Where the refresh credential is persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    File,
    Memory,
    Keyring,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
            Self::Keyring => write!(f, "keyring"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            "keyring" => Ok(Self::Keyring),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
const fn default_connect_timeout() -> u64 {
    CONNECT_TIMEOUT.as_secs()
}
const fn default_request_timeout() -> u64 {
    REQUEST_TIMEOUT.as_secs()
}
const fn default_refresh_timeout() -> u64 {
    REFRESH_TIMEOUT.as_secs()
}
fn default_login_route() -> String {
    LOGIN_ROUTE.to_string()
}
fn default_public_paths() -> Vec<String> {
    vec![LOGIN_ROUTE.to_string(), REGISTER_ROUTE.to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Default credentials file: `~/.config/folio-client/credentials.json`.
pub fn default_storage_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("Cannot determine config directory".into()))?;
    Ok(config_dir.join("folio-client").join("credentials.json"))
}

// ---------------------------------------------------------------------------
// Loading and env overrides
// ---------------------------------------------------------------------------

impl ClientConfig {
    /// Load configuration from a TOML file, then apply `FOLIO_*` environment
    /// overrides. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::storage_io(path, e.to_string()))?;
            Self::from_toml(&content)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Check that the base URL is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::Config(format!("invalid base_url '{}': {e}", self.api.base_url)))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "base_url must use http or https, got '{other}'"
                )));
            }
        }
        if !self.session.login_path.starts_with('/') {
            return Err(Error::Config(format!(
                "login_path must start with '/': '{}'",
                self.session.login_path
            )));
        }
        Ok(())
    }

    /// The effective credentials file for the `file` backend.
    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.session.storage_path {
            Some(path) => Ok(path.clone()),
            None => default_storage_path(),
        }
    }

    fn apply_env_overrides(&mut self) {
        let mut ov = EnvOverrides::default();

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = parsed;
                        ov.record($key, $env);
                    }
                }
            };
        }

        // -- API --
        env_str!("api.base_url", "FOLIO_API_BASE_URL", self.api.base_url);
        env_parse!(
            "api.connect_timeout_secs",
            "FOLIO_API_CONNECT_TIMEOUT",
            self.api.connect_timeout_secs
        );
        env_parse!(
            "api.request_timeout_secs",
            "FOLIO_API_REQUEST_TIMEOUT",
            self.api.request_timeout_secs
        );
        env_parse!(
            "api.refresh_timeout_secs",
            "FOLIO_API_REFRESH_TIMEOUT",
            self.api.refresh_timeout_secs
        );

        // -- Session --
        env_str!(
            "session.login_path",
            "FOLIO_SESSION_LOGIN_PATH",
            self.session.login_path
        );
        env_parse!(
            "session.storage",
            "FOLIO_SESSION_STORAGE",
            self.session.storage
        );
        if let Ok(val) = std::env::var("FOLIO_SESSION_STORAGE_PATH") {
            self.session.storage_path = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
            ov.record("session.storage_path", "FOLIO_SESSION_STORAGE_PATH");
        }

        // -- Logging --
        env_str!("logging.level", "FOLIO_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "FOLIO_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
    }
}
