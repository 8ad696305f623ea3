//! Account endpoints under `/Auth`.

use tracing::{debug, info, warn};

use crate::client::FolioClient;
use crate::config;
use crate::error::{Error, Result};
use crate::models::auth::{
    ConfirmEmailEnvelope, ConfirmEmailRequest, ForgotPasswordBody, LoginEnvelope, LoginRequest,
    LogoutBody, RefreshToken, RegisterEnvelope, RegisterRequest, ResetPasswordEnvelope,
    ResetPasswordRequest, TokenResponse, UserProfile,
};
use crate::transport::request::PendingRequest;

/// The server re-sends this when an address was already confirmed.
const ALREADY_CONFIRMED: &str = "object has been modified";

/// Account operations, borrowed from a [`FolioClient`].
pub struct AuthApi<'a> {
    client: &'a FolioClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a FolioClient) -> Self {
        Self { client }
    }

    /// Log in and persist the returned refresh credential.
    ///
    /// The session cookie from the response stays in the client's cookie jar.
    pub async fn login(&self, request: &LoginRequest) -> Result<()> {
        let envelope = LoginEnvelope { login_request: request };
        let response: TokenResponse = self
            .client
            .pipeline()
            .send_json(PendingRequest::post(config::LOGIN_PATH), &envelope)
            .await?;

        let token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidResponse("login response has no refreshToken".into()))?;

        self.client.credentials().store(RefreshToken::new(token)).await?;
        info!("Logged in");
        Ok(())
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let envelope = RegisterEnvelope { register_request: request };
        self.client
            .pipeline()
            .send(PendingRequest::post(config::REGISTER_PATH).json(&envelope)?)
            .await?;
        info!(username = request.username.as_str(), "Account registered");
        Ok(())
    }

    /// Confirm an email address. Confirming twice is not an error.
    pub async fn confirm_email(&self, request: &ConfirmEmailRequest) -> Result<()> {
        let envelope = ConfirmEmailEnvelope { request };
        let sent = self
            .client
            .pipeline()
            .send(PendingRequest::post(config::CONFIRM_EMAIL_PATH).json(&envelope)?)
            .await;

        match sent {
            Ok(_) => Ok(()),
            Err(Error::Api { message, .. }) if message.contains(ALREADY_CONFIRMED) => {
                debug!("Email already confirmed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        self.client
            .pipeline()
            .send(PendingRequest::post(config::FORGOT_PASSWORD_PATH).json(&ForgotPasswordBody { email })?)
            .await?;
        Ok(())
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<()> {
        let envelope = ResetPasswordEnvelope { resset_password: request };
        self.client
            .pipeline()
            .send(PendingRequest::post(config::RESET_PASSWORD_PATH).json(&envelope)?)
            .await?;
        Ok(())
    }

    /// The signed-in user, or `None` when there is no session.
    ///
    /// This is the bootstrap identity check: a 401 here never starts a refresh.
    pub async fn current_user(&self) -> Result<Option<UserProfile>> {
        match self.client.pipeline().get_json(config::GET_USER_PATH).await {
            Ok(profile) => Ok(Some(profile)),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Revoke the session on the server if possible, then forget it locally.
    ///
    /// The server call is sent even with nothing stored so a leftover session
    /// cookie is cleared. Its failure is logged and otherwise ignored.
    pub async fn logout(&self) -> Result<()> {
        let token = self.client.credentials().current().await;
        let request = PendingRequest::post(config::LOGOUT_PATH).json(&LogoutBody {
            refresh_token: token.as_ref().map(RefreshToken::expose),
        })?;
        if let Err(e) = self.client.transport().send(&request).await {
            warn!(error = %e, "Server-side logout failed");
        }

        if self.client.credentials().evict().await? {
            info!("Logged out");
        } else {
            debug!("Logout without a stored credential");
        }
        Ok(())
    }
}
