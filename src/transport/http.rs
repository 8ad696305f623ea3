//! The bare HTTP transport: one request in, one response out, no recovery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderValue};
use tracing::debug;

use super::request::{ApiResponse, PendingRequest};
use crate::config::{ApiConfig, USER_AGENT};
use crate::error::{Error, Result};

/// Sends a single request without any session handling.
///
/// Non-2xx responses come back as [`Error::Api`] so callers can classify
/// them by status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &PendingRequest) -> Result<ApiResponse>;
}

/// Blanket impl for `Arc<T>`.
#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &PendingRequest) -> Result<ApiResponse> {
        (**self).send(request).await
    }
}

/// Transport over a cookie-aware [`reqwest::Client`].
///
/// The client's cookie jar holds the server-set session cookie and attaches
/// it to every request, including those replayed after a refresh.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport with the configured timeouts and a fresh cookie jar.
    pub fn new(base_url: impl Into<String>, config: &ApiConfig) -> Result<Self> {
        let client = build_client(config.connect_timeout(), config.request_timeout())?;
        Ok(Self::with_client(client, base_url))
    }

    /// Use a caller-supplied client. It should have a cookie store enabled.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path relative to the API root.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Build the default cookie-aware client.
pub fn build_client(connect_timeout: Duration, request_timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .cookie_store(true)
        .connect_timeout(connect_timeout)
        .timeout(request_timeout)
        .build()
        .map_err(Error::Network)
}

/// Map a reqwest send error onto the crate error, keeping timeouts distinct.
pub(crate) fn map_send_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(e)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PendingRequest) -> Result<ApiResponse> {
        let url = self.url(&request.path);
        debug!(method = %request.method, path = request.path.as_str(), "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers.clone())
            .header(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_send_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(map_send_error)?;

        if !status.is_success() {
            debug!(
                method = %request.method,
                path = request.path.as_str(),
                status = status.as_u16(),
                "Request failed"
            );
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let transport = HttpTransport::with_client(reqwest::Client::new(), "http://localhost:4200/api/");
        assert_eq!(transport.base_url(), "http://localhost:4200/api");
        assert_eq!(transport.url("/Holdings"), "http://localhost:4200/api/Holdings");
        assert_eq!(transport.url("Holdings/3"), "http://localhost:4200/api/Holdings/3");
    }
}
