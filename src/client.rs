//! Main client entry point.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::api::auth::AuthApi;
use crate::api::coins::CoinsApi;
use crate::api::holdings::HoldingsApi;
use crate::auth::{
    BootstrapGuard, CredentialStore, HeadlessNavigator, HttpRefreshExchange, Navigator,
    RedirectPolicy,
};
use crate::config::{ClientConfig, StorageBackend};
use crate::error::{Error, Result};
use crate::storage::{CredentialPersistence, FilePersistence, MemoryPersistence};
use crate::transport::http::{HttpTransport, Transport, build_client};
use crate::transport::pipeline::SessionPipeline;

/// Folio API client.
///
/// # Examples
///
/// ```rust,no_run
/// use folio_client::{FolioClientBuilder, LoginRequest};
///
/// # async fn example() -> folio_client::Result<()> {
/// let client = FolioClientBuilder::new()
///     .base_url("http://localhost:4200/api")
///     .build()
///     .await?;
///
/// client.auth().login(&LoginRequest {
///     email: "alice@example.com".into(),
///     password: "hunter2".into(),
/// }).await?;
///
/// for holding in client.holdings().list().await? {
///     println!("{} @ {}", holding.coin_name, holding.average_price);
/// }
/// # Ok(())
/// # }
/// ```
pub struct FolioClient {
    config: ClientConfig,
    transport: Arc<HttpTransport>,
    store: Arc<CredentialStore>,
    pipeline: Arc<SessionPipeline>,
    navigator: Arc<dyn Navigator>,
}

impl FolioClient {
    /// Create a builder for configuring the client.
    pub fn builder() -> FolioClientBuilder {
        FolioClientBuilder::new()
    }

    /// Account endpoints: login, registration, identity, logout.
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn holdings(&self) -> HoldingsApi<'_> {
        HoldingsApi::new(self)
    }

    pub fn coins(&self) -> CoinsApi<'_> {
        CoinsApi::new(self)
    }

    /// The session pipeline, for calls not covered by the typed API.
    pub fn pipeline(&self) -> &SessionPipeline {
        &self.pipeline
    }

    /// The bare transport. Nothing sent here is refreshed or replayed.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Fail fast with [`Error::NotAuthenticated`] when nothing is stored.
    pub async fn ensure_signed_in(&self) -> Result<()> {
        if self.store.is_signed_in().await {
            Ok(())
        } else {
            Err(Error::NotAuthenticated)
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.store
    }

    pub fn navigator(&self) -> &dyn Navigator {
        self.navigator.as_ref()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for FolioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolioClient")
            .field("base_url", &self.transport.base_url())
            .field("store", &self.store)
            .finish()
    }
}

/// Builder for [`FolioClient`].
#[derive(Default)]
pub struct FolioClientBuilder {
    config: Option<ClientConfig>,
    base_url: Option<String>,
    storage: Option<Arc<dyn CredentialPersistence>>,
    navigator: Option<Arc<dyn Navigator>>,
    reqwest_client: Option<reqwest::Client>,
    guard: Option<BootstrapGuard>,
    redirect_policy: Option<RedirectPolicy>,
    refresh_timeout: Option<Duration>,
}

impl FolioClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the credential backend, bypassing `session.storage`.
    pub fn storage(mut self, storage: Arc<dyn CredentialPersistence>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Set a custom reqwest client. It must have a cookie store enabled for
    /// the session cookie to survive a refresh.
    pub fn reqwest_client(mut self, client: reqwest::Client) -> Self {
        self.reqwest_client = Some(client);
        self
    }

    pub fn guard(mut self, guard: BootstrapGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.redirect_policy = Some(policy);
        self
    }

    /// Bound each refresh exchange, overriding `api.refresh_timeout_secs`.
    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = Some(timeout);
        self
    }

    /// Build the client, reading any persisted refresh credential.
    pub async fn build(self) -> Result<FolioClient> {
        let mut config = self.config.unwrap_or_default();
        if let Some(url) = self.base_url {
            config.api.base_url = url;
        }
        config.validate()?;

        let storage = match self.storage {
            Some(storage) => storage,
            None => storage_from_config(&config)?,
        };
        let store = Arc::new(CredentialStore::open(storage).await?);

        let client = match self.reqwest_client {
            Some(client) => client,
            None => build_client(config.api.connect_timeout(), config.api.request_timeout())?,
        };
        let transport = Arc::new(HttpTransport::with_client(client.clone(), &config.api.base_url));
        let exchange = Arc::new(HttpRefreshExchange::new(client, transport.base_url()));

        let policy = self.redirect_policy.unwrap_or_else(|| {
            RedirectPolicy::new(
                config.session.login_path.clone(),
                config.session.public_paths.clone(),
            )
        });
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(HeadlessNavigator::default()));

        let pipeline = SessionPipeline::builder(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&store),
            exchange,
        )
        .guard(self.guard.unwrap_or_default())
        .redirect_policy(policy)
        .navigator(Arc::clone(&navigator))
        .refresh_timeout(self.refresh_timeout.unwrap_or_else(|| config.api.refresh_timeout()))
        .build();

        info!(
            base_url = transport.base_url(),
            storage = store.storage_name(),
            signed_in = store.is_signed_in().await,
            "FolioClient initialized"
        );
        Ok(FolioClient {
            config,
            transport,
            store,
            pipeline: Arc::new(pipeline),
            navigator,
        })
    }
}

fn storage_from_config(config: &ClientConfig) -> Result<Arc<dyn CredentialPersistence>> {
    match config.session.storage {
        StorageBackend::File => Ok(Arc::new(FilePersistence::new(config.storage_path()?))),
        StorageBackend::Memory => Ok(Arc::new(MemoryPersistence::new())),
        #[cfg(feature = "keyring")]
        StorageBackend::Keyring => Ok(Arc::new(crate::storage::KeyringPersistence::new())),
        #[cfg(not(feature = "keyring"))]
        StorageBackend::Keyring => Err(Error::Config(
            "keyring storage requires the `keyring` feature".into(),
        )),
    }
}
