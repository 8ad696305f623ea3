//! Refresh credential exchange.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::REFRESH_PATH;
use crate::error::RefreshError;
use crate::models::auth::{RefreshToken, RefreshTokenBody, TokenResponse};

/// Trades the current refresh credential for a new session.
///
/// Implementations must not route through the request pipeline, otherwise a
/// failing exchange would itself trigger another exchange. The server rotates
/// the credential on every call, so the returned value replaces the old one.
#[async_trait]
pub trait RefreshExchange: Send + Sync {
    async fn refresh(&self, current: &RefreshToken) -> Result<RefreshToken, RefreshError>;
}

/// Exchange over HTTP.
///
/// POST `{base}/Auth/refresh-token`
/// Body: `{"refreshToken": "..."}`
///
/// The response also sets the new session cookie; sharing the pipeline
/// transport's client means the cookie lands in the same jar.
#[derive(Debug, Clone)]
pub struct HttpRefreshExchange {
    client: reqwest::Client,
    url: String,
}

impl HttpRefreshExchange {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RefreshExchange for HttpRefreshExchange {
    async fn refresh(&self, current: &RefreshToken) -> Result<RefreshToken, RefreshError> {
        info!("Refreshing session");

        let response = self
            .client
            .post(&self.url)
            .json(&RefreshTokenBody {
                refresh_token: current.expose(),
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RefreshError::Timeout
                } else {
                    RefreshError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected { status, message });
        }

        let data: TokenResponse = response.json().await.map_err(|e| {
            RefreshError::InvalidResponse(format!("Failed to parse refresh response: {}", e))
        })?;

        match data.refresh_token {
            Some(token) if !token.is_empty() => {
                debug!("Refresh credential rotated");
                Ok(RefreshToken::new(token))
            }
            _ => Err(RefreshError::InvalidResponse(
                "Response does not contain refreshToken".into(),
            )),
        }
    }
}
