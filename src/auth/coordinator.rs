//! Single-flight refresh coordination.
//!
//! The server rotates the refresh credential on every exchange, so two
//! concurrent exchanges would race: the second one submits a credential the
//! first already consumed and fails, evicting a session that was fine. The
//! coordinator lets exactly one exchange run at a time and hands its outcome
//! to every caller that arrives while it is running.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::redirect::{Navigation, Navigator, RedirectPolicy};
use super::refresh::RefreshExchange;
use super::store::CredentialStore;
use crate::config::REFRESH_TIMEOUT;
use crate::error::RefreshError;
use crate::models::auth::RefreshToken;

/// New store generation on success.
type RefreshOutcome = Result<u64, RefreshError>;

/// What the caller should do after a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// A new session is in place; replay the request.
    Replay,
    /// Nothing to refresh with; surface the original failure.
    NoCredential,
}

struct InFlight {
    id: u64,
    outcome: Shared<BoxFuture<'static, RefreshOutcome>>,
}

struct Inner {
    store: Arc<CredentialStore>,
    exchange: Arc<dyn RefreshExchange>,
    policy: RedirectPolicy,
    navigator: Arc<dyn Navigator>,
    timeout: Duration,
    in_flight: Mutex<Option<InFlight>>,
}

/// Runs at most one refresh exchange at a time.
///
/// Only the task driving the exchange touches the credential store. On
/// failure it evicts the credential and consults the redirect policy once,
/// however many callers were waiting.
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
    next_id: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        exchange: Arc<dyn RefreshExchange>,
        policy: RedirectPolicy,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                exchange,
                policy,
                navigator,
                timeout: REFRESH_TIMEOUT,
                in_flight: Mutex::new(None),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Bound a single exchange. Must be called before the coordinator is shared.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.timeout = timeout;
        }
        self
    }

    pub fn policy(&self) -> &RedirectPolicy {
        &self.inner.policy
    }

    /// True while an exchange is running.
    pub async fn is_refreshing(&self) -> bool {
        self.inner.in_flight.lock().await.is_some()
    }

    /// Recover from a 401 on a request sent at store generation `observed`.
    ///
    /// Joins the running exchange if there is one. Otherwise, if the
    /// credential changed since the request was sent, the request is simply
    /// replayed; if there is no credential, nothing is attempted.
    pub async fn recover(&self, observed: u64) -> Result<Recovery, RefreshError> {
        let outcome = {
            let mut slot = self.inner.in_flight.lock().await;
            match slot.as_ref() {
                Some(running) => {
                    debug!(id = running.id, "Joining in-flight refresh");
                    running.outcome.clone()
                }
                None => {
                    let (generation, token) = self.inner.store.snapshot().await;
                    let Some(token) = token else {
                        debug!("No refresh credential stored");
                        return Ok(Recovery::NoCredential);
                    };
                    if generation != observed {
                        debug!(observed, generation, "Credential changed while request was in flight");
                        return Ok(Recovery::Replay);
                    }

                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let handle =
                        tokio::spawn(run_exchange(Arc::clone(&self.inner), id, generation, token));
                    let inner = Arc::clone(&self.inner);
                    let outcome = async move {
                        match handle.await {
                            Ok(outcome) => outcome,
                            Err(e) => {
                                warn!(id, error = %e, "Refresh task ended without an outcome");
                                inner.release(id).await;
                                Err(RefreshError::Aborted)
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some(InFlight {
                        id,
                        outcome: outcome.clone(),
                    });
                    outcome
                }
            }
        };

        outcome.await.map(|_| Recovery::Replay)
    }
}

impl Inner {
    /// Free the in-flight slot if it still belongs to exchange `id`.
    async fn release(&self, id: u64) {
        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|running| running.id == id) {
            *slot = None;
        }
    }
}

/// Drive one exchange started at store generation `started`, apply its
/// outcome, then free the slot.
///
/// Writes are conditional on the store still being at `started`: a login or
/// logout that lands while the exchange is running wins over its result.
async fn run_exchange(inner: Arc<Inner>, id: u64, started: u64, current: RefreshToken) -> RefreshOutcome {
    let result = match tokio::time::timeout(inner.timeout, inner.exchange.refresh(&current)).await {
        Ok(result) => result,
        Err(_) => Err(RefreshError::Timeout),
    };

    let outcome = match result {
        Ok(rotated) => Ok(apply_rotation(&inner, started, rotated).await),
        Err(e) => apply_failure(&inner, started, e).await,
    };

    inner.release(id).await;
    outcome
}

async fn apply_rotation(inner: &Inner, started: u64, rotated: RefreshToken) -> u64 {
    match inner.store.store_if(started, rotated).await {
        Ok(Some(generation)) => {
            info!(generation, "Session refreshed");
            generation
        }
        Ok(None) => {
            let generation = inner.store.generation().await;
            debug!(started, generation, "Credential changed during refresh, discarding rotation");
            generation
        }
        Err(e) => {
            // The in-memory slot holds the rotated value; only persistence failed.
            warn!(error = %e, "Session refreshed but not persisted");
            inner.store.generation().await
        }
    }
}

async fn apply_failure(inner: &Inner, started: u64, e: RefreshError) -> RefreshOutcome {
    match inner.store.evict_if(started).await {
        Ok(true) => {}
        Ok(false) => {
            let (generation, token) = inner.store.snapshot().await;
            if token.is_some() {
                debug!(started, generation, "Refresh failed but a newer login is in place");
                return Ok(generation);
            }
            debug!(error = %e, "Refresh failed after the session was already cleared");
            return Err(e);
        }
        Err(err) => warn!("Failed to remove persisted credential: {}", err),
    }

    warn!(error = %e, "Session refresh failed, credential evicted");
    let location = inner.navigator.current_location();
    match inner.policy.on_unrecoverable_session_failure(&location) {
        Navigation::Redirect(to) => inner.navigator.navigate(&to),
        Navigation::Stay => debug!(location = location.as_str(), "Already on a public surface"),
    }
    Err(e)
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("store", &self.inner.store)
            .field("timeout", &self.inner.timeout)
            .finish()
    }
}
