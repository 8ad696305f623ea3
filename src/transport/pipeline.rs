//! Session-aware request pipeline.
//!
//! Wraps a bare [`Transport`]. Successful responses and non-401 failures pass
//! through untouched. A 401 gets one recovery cycle: refresh the session
//! (single-flight, see [`RefreshCoordinator`]) and replay the request once.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::http::Transport;
use super::request::{ApiResponse, PendingRequest};
use crate::auth::coordinator::{Recovery, RefreshCoordinator};
use crate::auth::guard::BootstrapGuard;
use crate::auth::redirect::{HeadlessNavigator, Navigator, RedirectPolicy};
use crate::auth::refresh::RefreshExchange;
use crate::auth::store::CredentialStore;
use crate::config::REFRESH_TIMEOUT;
use crate::error::Result;

/// The request pipeline every authenticated call goes through.
pub struct SessionPipeline {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    guard: BootstrapGuard,
    coordinator: RefreshCoordinator,
}

impl SessionPipeline {
    pub fn builder(
        transport: Arc<dyn Transport>,
        store: Arc<CredentialStore>,
        exchange: Arc<dyn RefreshExchange>,
    ) -> SessionPipelineBuilder {
        SessionPipelineBuilder {
            transport,
            store,
            exchange,
            guard: BootstrapGuard::default(),
            policy: RedirectPolicy::default(),
            navigator: None,
            refresh_timeout: REFRESH_TIMEOUT,
        }
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn guard(&self) -> &BootstrapGuard {
        &self.guard
    }

    pub fn redirect_policy(&self) -> &RedirectPolicy {
        self.coordinator.policy()
    }

    /// Send a request, recovering from an expired session at most once.
    pub async fn send(&self, mut request: PendingRequest) -> Result<ApiResponse> {
        loop {
            let generation = self.store.generation().await;

            let failure = match self.transport.send(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !failure.is_unauthorized() {
                return Err(failure);
            }
            if self.guard.is_exempt(&request) {
                debug!(path = request.path.as_str(), "Bootstrap call unauthorized, no active session");
                return Err(failure);
            }
            if request.retried {
                warn!(
                    method = %request.method,
                    path = request.path.as_str(),
                    "Request still unauthorized after refresh"
                );
                return Err(failure);
            }
            request.retried = true;

            match self.coordinator.recover(generation).await? {
                Recovery::Replay => {
                    debug!(method = %request.method, path = request.path.as_str(), "Replaying request");
                }
                Recovery::NoCredential => return Err(failure),
            }
        }
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(PendingRequest::get(path)).await?.json()
    }

    /// Send `body` with `request`'s method and path, decoding the JSON reply.
    pub async fn send_json<B, T>(&self, request: PendingRequest, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(request.json(body)?).await?.json()
    }
}

impl std::fmt::Debug for SessionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPipeline")
            .field("store", &self.store)
            .field("guard", &self.guard)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

/// Builder for [`SessionPipeline`].
pub struct SessionPipelineBuilder {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
    exchange: Arc<dyn RefreshExchange>,
    guard: BootstrapGuard,
    policy: RedirectPolicy,
    navigator: Option<Arc<dyn Navigator>>,
    refresh_timeout: Duration,
}

impl SessionPipelineBuilder {
    pub fn guard(mut self, guard: BootstrapGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn build(self) -> SessionPipeline {
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(HeadlessNavigator::default()));
        let coordinator = RefreshCoordinator::new(
            Arc::clone(&self.store),
            self.exchange,
            self.policy,
            navigator,
        )
        .with_timeout(self.refresh_timeout);

        SessionPipeline {
            transport: self.transport,
            store: self.store,
            guard: self.guard,
            coordinator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, RefreshError};
    use crate::models::auth::RefreshToken;
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport answering each path from a queue of statuses; the last
    /// status repeats once the queue is drained.
    #[derive(Default)]
    struct ScriptedTransport {
        script: Mutex<HashMap<String, VecDeque<u16>>>,
        sent: Mutex<Vec<(String, bool)>>,
    }

    impl ScriptedTransport {
        fn respond(self, path: &str, statuses: &[u16]) -> Self {
            self.script
                .lock()
                .unwrap()
                .insert(path.to_string(), statuses.iter().copied().collect());
            self
        }

        fn sent_to(&self, path: &str) -> usize {
            self.sent.lock().unwrap().iter().filter(|(p, _)| p == path).count()
        }

        fn retried_flags(&self) -> Vec<bool> {
            self.sent.lock().unwrap().iter().map(|(_, r)| *r).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &PendingRequest) -> Result<ApiResponse> {
            self.sent
                .lock()
                .unwrap()
                .push((request.path.clone(), request.retried));
            let status = {
                let mut script = self.script.lock().unwrap();
                let queue = script.entry(request.path.clone()).or_default();
                if queue.len() > 1 {
                    queue.pop_front().unwrap_or(200)
                } else {
                    queue.front().copied().unwrap_or(200)
                }
            };
            tokio::task::yield_now().await;
            if (200..300).contains(&status) {
                Ok(ApiResponse::new(status, format!(r#"{{"path":"{}"}}"#, request.path)))
            } else {
                Err(Error::Api {
                    status,
                    message: format!("status {status}"),
                })
            }
        }
    }

    struct CountingExchange {
        calls: AtomicUsize,
        result: std::result::Result<&'static str, RefreshError>,
    }

    impl CountingExchange {
        fn ok(token: &'static str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Ok(token),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                result: Err(RefreshError::Rejected {
                    status: 401,
                    message: "refresh token expired".into(),
                }),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RefreshExchange for CountingExchange {
        async fn refresh(&self, _current: &RefreshToken) -> std::result::Result<RefreshToken, RefreshError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.result.clone().map(RefreshToken::new)
        }
    }

    struct Harness {
        transport: Arc<ScriptedTransport>,
        exchange: Arc<CountingExchange>,
        navigator: Arc<HeadlessNavigator>,
        store: Arc<CredentialStore>,
        pipeline: SessionPipeline,
    }

    async fn harness(
        transport: ScriptedTransport,
        exchange: Arc<CountingExchange>,
        credential: Option<&str>,
        location: &str,
    ) -> Harness {
        let transport = Arc::new(transport);
        let store = Arc::new(CredentialStore::in_memory());
        if let Some(token) = credential {
            store.store(RefreshToken::new(token)).await.unwrap();
        }
        let navigator = Arc::new(HeadlessNavigator::new(location));
        let pipeline = SessionPipeline::builder(
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::clone(&store),
            Arc::clone(&exchange) as Arc<dyn RefreshExchange>,
        )
        .navigator(Arc::clone(&navigator) as Arc<dyn Navigator>)
        .build();
        Harness {
            transport,
            exchange,
            navigator,
            store,
            pipeline,
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let h = harness(ScriptedTransport::default(), CountingExchange::ok("t2"), Some("t1"), "/").await;
        let resp = h.pipeline.send(PendingRequest::get("/Holdings")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(h.exchange.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_unauthorized_failure_is_untouched() {
        for status in [400, 403, 404, 500, 503] {
            let transport = ScriptedTransport::default().respond("/Holdings", &[status]);
            let h = harness(transport, CountingExchange::ok("t2"), Some("t1"), "/").await;

            let err = h.pipeline.send(PendingRequest::get("/Holdings")).await.unwrap_err();
            assert_eq!(err.status(), Some(status));
            assert_eq!(h.exchange.calls(), 0);
            assert_eq!(h.transport.sent_to("/Holdings"), 1);
            assert_eq!(h.store.current().await.unwrap().expose(), "t1");
        }
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_and_replays_once() {
        let transport = ScriptedTransport::default().respond("/Holdings", &[401, 200]);
        let h = harness(transport, CountingExchange::ok("T2"), Some("T1"), "/").await;

        let resp = h.pipeline.send(PendingRequest::get("/Holdings")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(h.exchange.calls(), 1);
        assert_eq!(h.transport.sent_to("/Holdings"), 2);
        assert_eq!(h.transport.retried_flags(), vec![false, true]);
        assert_eq!(h.store.current().await.unwrap().expose(), "T2");
    }

    #[tokio::test]
    async fn test_retried_request_never_refreshes_twice() {
        let transport = ScriptedTransport::default().respond("/Holdings", &[401]);
        let h = harness(transport, CountingExchange::ok("T2"), Some("T1"), "/").await;

        let err = h.pipeline.send(PendingRequest::get("/Holdings")).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(h.exchange.calls(), 1);
        assert_eq!(h.transport.sent_to("/Holdings"), 2);
        // The session was renewed fine; only this request is rejected.
        assert_eq!(h.store.current().await.unwrap().expose(), "T2");
        assert!(h.navigator.history().is_empty());
    }

    #[tokio::test]
    async fn test_already_retried_request_is_terminal() {
        let transport = ScriptedTransport::default().respond("/Holdings", &[401]);
        let h = harness(transport, CountingExchange::ok("T2"), Some("T1"), "/").await;

        let mut request = PendingRequest::get("/Holdings");
        request.retried = true;
        assert!(h.pipeline.send(request).await.unwrap_err().is_unauthorized());
        assert_eq!(h.exchange.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_credential_fails_without_refresh() {
        let transport = ScriptedTransport::default().respond("/Holdings", &[401]);
        let h = harness(transport, CountingExchange::ok("T2"), None, "/").await;

        let err = h.pipeline.send(PendingRequest::get("/Holdings")).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert!(!err.is_session_lost());
        assert_eq!(h.exchange.calls(), 0);
        assert_eq!(h.transport.sent_to("/Holdings"), 1);
        assert!(h.navigator.history().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_call_is_exempt() {
        let transport = ScriptedTransport::default().respond("/Auth/get-user", &[401]);
        let h = harness(transport, CountingExchange::ok("T2"), Some("T1"), "/").await;

        let err = h.pipeline.send(PendingRequest::get("/Auth/get-user")).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(h.exchange.calls(), 0);
        assert!(h.navigator.history().is_empty());
        assert_eq!(h.store.current().await.unwrap().expose(), "T1");
    }

    #[tokio::test]
    async fn test_refresh_failure_evicts_and_redirects() {
        let transport = ScriptedTransport::default().respond("/Holdings", &[401]);
        let h = harness(transport, CountingExchange::failing(), Some("T1"), "/profile").await;

        let err = h.pipeline.send(PendingRequest::get("/Holdings")).await.unwrap_err();
        assert!(err.is_session_lost());
        assert!(matches!(
            err,
            Error::RefreshFailed(RefreshError::Rejected { status: 401, .. })
        ));
        assert!(h.store.current().await.is_none());
        assert_eq!(h.navigator.history(), vec!["/login"]);
        assert_eq!(h.transport.sent_to("/Holdings"), 1);

        // No further refresh until a new login.
        h.navigator.set_location("/profile");
        let err = h.pipeline.send(PendingRequest::get("/Holdings")).await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(h.exchange.calls(), 1);
        assert_eq!(h.navigator.history().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_on_public_surface_stays() {
        for location in ["/login", "/register"] {
            let transport = ScriptedTransport::default().respond("/Holdings", &[401]);
            let h = harness(transport, CountingExchange::failing(), Some("T1"), location).await;

            assert!(h.pipeline.send(PendingRequest::get("/Holdings")).await.is_err());
            assert!(h.store.current().await.is_none());
            assert!(h.navigator.history().is_empty());
        }
    }

    #[tokio::test]
    async fn test_concurrent_unauthorized_share_one_refresh() {
        let transport = ScriptedTransport::default()
            .respond("/Holdings", &[401, 200])
            .respond("/Coins", &[401, 200])
            .respond("/Holdings/1", &[401, 200]);
        let h = harness(transport, CountingExchange::ok("T2"), Some("T1"), "/").await;

        let (a, b, c) = tokio::join!(
            h.pipeline.send(PendingRequest::get("/Holdings")),
            h.pipeline.send(PendingRequest::get("/Coins")),
            h.pipeline.send(PendingRequest::get("/Holdings/1")),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(h.exchange.calls(), 1);
        assert_eq!(h.transport.sent_to("/Coins"), 2);
        assert_eq!(h.store.current().await.unwrap().expose(), "T2");
    }

    #[tokio::test]
    async fn test_concurrent_refresh_failure_redirects_once() {
        let transport = ScriptedTransport::default()
            .respond("/Holdings", &[401])
            .respond("/Coins", &[401]);
        let h = harness(transport, CountingExchange::failing(), Some("T1"), "/").await;

        let (a, b) = tokio::join!(
            h.pipeline.send(PendingRequest::get("/Holdings")),
            h.pipeline.send(PendingRequest::get("/Coins")),
        );
        assert!(a.unwrap_err().is_session_lost());
        assert!(b.unwrap_err().is_session_lost());
        assert_eq!(h.exchange.calls(), 1);
        assert_eq!(h.navigator.history(), vec!["/login"]);
    }
}
