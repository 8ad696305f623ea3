//! Calls exempt from refresh-and-redirect handling.
//!
//! The identity check issued at startup is expected to fail with 401 for an
//! anonymous visitor. Treating that as an expired session would trigger a
//! refresh attempt or, on the login page, a redirect loop.

use reqwest::Method;

use crate::config::GET_USER_PATH;
use crate::transport::request::{PendingRequest, normalize_path};

/// One exempted `(method, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemptCall {
    pub method: Method,
    pub path: String,
}

impl ExemptCall {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = normalize_path(&path).to_string();
        Self { method, path }
    }

    fn matches(&self, request: &PendingRequest) -> bool {
        self.method == request.method && self.path == request.route()
    }
}

/// Explicit allow-list of bootstrap calls.
#[derive(Debug, Clone)]
pub struct BootstrapGuard {
    exempt: Vec<ExemptCall>,
}

impl BootstrapGuard {
    /// A guard with no exemptions.
    pub fn none() -> Self {
        Self { exempt: Vec::new() }
    }

    pub fn with_exemption(mut self, method: Method, path: impl Into<String>) -> Self {
        self.exempt.push(ExemptCall::new(method, path));
        self
    }

    /// True if failures of `request` must pass through untouched.
    pub fn is_exempt(&self, request: &PendingRequest) -> bool {
        self.exempt.iter().any(|call| call.matches(request))
    }

    pub fn exempt_calls(&self) -> &[ExemptCall] {
        &self.exempt
    }
}

impl Default for BootstrapGuard {
    /// Exempts `GET /Auth/get-user`.
    fn default() -> Self {
        Self::none().with_exemption(Method::GET, GET_USER_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_exempts_identity_check() {
        let guard = BootstrapGuard::default();
        assert!(guard.is_exempt(&PendingRequest::get("/Auth/get-user")));
        assert!(guard.is_exempt(&PendingRequest::get("/Auth/get-user/")));
        assert!(guard.is_exempt(&PendingRequest::get("/Auth/get-user?x=1")));
        assert_eq!(guard.exempt_calls().len(), 1);
    }

    #[test]
    fn test_only_exact_calls_are_exempt() {
        let guard = BootstrapGuard::default();
        assert!(!guard.is_exempt(&PendingRequest::get("/Holdings")));
        assert!(!guard.is_exempt(&PendingRequest::post("/Auth/get-user")));
        assert!(!guard.is_exempt(&PendingRequest::get("/Admin/Auth/get-user")));
        assert!(!guard.is_exempt(&PendingRequest::get("/Auth/get-user/avatar")));
    }

    #[test]
    fn test_empty_guard() {
        let guard = BootstrapGuard::none();
        assert!(!guard.is_exempt(&PendingRequest::get("/Auth/get-user")));
    }
}
