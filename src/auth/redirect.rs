//! Where to send the user after the session is lost.

use std::sync::Mutex;
use tracing::info;

use crate::config::{LOGIN_ROUTE, REGISTER_ROUTE};
use crate::transport::request::normalize_path;

/// Outcome of [`RedirectPolicy::on_unrecoverable_session_failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Already on a public surface.
    Stay,
    /// Navigate to the given path.
    Redirect(String),
}

/// Decides whether a lost session sends the user to the login surface.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    login_path: String,
    public_paths: Vec<String>,
}

impl RedirectPolicy {
    /// `login_path` is always treated as public.
    pub fn new(login_path: impl Into<String>, public_paths: impl IntoIterator<Item = String>) -> Self {
        let login_path: String = login_path.into();
        let login_path = normalize_path(&login_path).to_string();
        let mut public: Vec<String> = public_paths
            .into_iter()
            .map(|p| normalize_path(&p).to_string())
            .collect();
        if !public.contains(&login_path) {
            public.push(login_path.clone());
        }
        Self {
            login_path,
            public_paths: public,
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn public_paths(&self) -> &[String] {
        &self.public_paths
    }

    /// Decide based on the path component of `current_location`.
    pub fn on_unrecoverable_session_failure(&self, current_location: &str) -> Navigation {
        let current = normalize_path(current_location);
        if self.public_paths.iter().any(|p| p == current) {
            Navigation::Stay
        } else {
            Navigation::Redirect(self.login_path.clone())
        }
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self::new(LOGIN_ROUTE, [LOGIN_ROUTE.to_string(), REGISTER_ROUTE.to_string()])
    }
}

/// The user agent: knows where the user is and can move them.
pub trait Navigator: Send + Sync {
    fn current_location(&self) -> String;

    fn navigate(&self, path: &str);
}

/// A navigator that only tracks a location, for headless use and tests.
#[derive(Debug)]
pub struct HeadlessNavigator {
    location: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl HeadlessNavigator {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: Mutex::new(location.into()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Move without recording a navigation (e.g. the user typed a URL).
    pub fn set_location(&self, location: impl Into<String>) {
        *self.location.lock().unwrap_or_else(|e| e.into_inner()) = location.into();
    }

    /// Every navigation performed through [`Navigator::navigate`].
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for HeadlessNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for HeadlessNavigator {
    fn current_location(&self) -> String {
        self.location.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn navigate(&self, path: &str) {
        info!(to = path, "Navigating");
        self.set_location(path);
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(path.to_string());
    }
}
