//! Authentication-related types.

use serde::{Deserialize, Serialize};

/// Long-lived opaque refresh credential.
///
/// `Debug` is redacted so the value never ends up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential, for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefreshToken(***)")
    }
}

impl From<&str> for RefreshToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RefreshToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Body of `POST /Auth/refresh-token` and `POST /Auth/logout`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenBody<'a> {
    pub refresh_token: &'a str,
}

/// `POST /Auth/logout` body. The token is `null` when none is stored; the
/// server still clears the session cookie.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LogoutBody<'a> {
    pub refresh_token: Option<&'a str>,
}

/// Response carrying a (rotated) refresh credential.
///
/// Returned by both login and refresh.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Credentials submitted on login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginEnvelope<'a> {
    pub login_request: &'a LoginRequest,
}

/// New account details.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterEnvelope<'a> {
    pub register_request: &'a RegisterRequest,
}

/// Parameters from the confirmation link sent by email.
#[derive(Debug, Clone, Serialize)]
pub struct ConfirmEmailRequest {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ConfirmEmailEnvelope<'a> {
    pub request: &'a ConfirmEmailRequest,
}

#[derive(Debug, Serialize)]
pub(crate) struct ForgotPasswordBody<'a> {
    pub email: &'a str,
}

/// Second step of the password reset flow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// The server expects this exact (misspelled) key.
#[derive(Debug, Serialize)]
pub(crate) struct ResetPasswordEnvelope<'a> {
    #[serde(rename = "ressetPassword")]
    pub resset_password: &'a ResetPasswordRequest,
}

/// Identity returned by `GET /Auth/get-user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_name: String,
    pub email: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl UserProfile {
    /// Email with the local part shortened to three characters, e.g.
    /// `ali***@example.com`.
    pub fn masked_email(&self) -> String {
        let Some((name, domain)) = self.email.split_once('@') else {
            return self.email.clone();
        };
        if name.chars().count() <= 3 {
            format!("***@{domain}")
        } else {
            let prefix: String = name.chars().take(3).collect();
            format!("{prefix}***@{domain}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_token_debug_is_redacted() {
        let token = RefreshToken::new("super-secret");
        assert_eq!(format!("{token:?}"), "RefreshToken(***)");
        assert_eq!(token.expose(), "super-secret");
    }

    #[test]
    fn test_login_envelope_shape() {
        let login = LoginRequest {
            email: "a@b.c".into(),
            password: "pw".into(),
        };
        let json = serde_json::to_value(LoginEnvelope { login_request: &login }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"loginRequest": {"email": "a@b.c", "password": "pw"}})
        );
    }

    #[test]
    fn test_reset_password_envelope_shape() {
        let reset = ResetPasswordRequest {
            email: "a@b.c".into(),
            code: "123456".into(),
            new_password: "new".into(),
        };
        let json = serde_json::to_value(ResetPasswordEnvelope { resset_password: &reset }).unwrap();
        assert_eq!(json["ressetPassword"]["newPassword"], "new");
    }

    #[test]
    fn test_confirm_email_uses_server_casing() {
        let req = ConfirmEmailRequest {
            user_id: "42".into(),
            token: "tok".into(),
        };
        let json = serde_json::to_value(ConfirmEmailEnvelope { request: &req }).unwrap();
        assert_eq!(json["request"]["userID"], "42");
    }

    #[test]
    fn test_masked_email() {
        let mut profile = UserProfile {
            user_name: "alice".into(),
            email: "alice@example.com".into(),
            avatar_url: None,
        };
        assert_eq!(profile.masked_email(), "ali***@example.com");

        profile.email = "bob@example.com".into();
        assert_eq!(profile.masked_email(), "***@example.com");
    }

    #[test]
    fn test_profile_deserializes_null_avatar() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"userName":"alice","email":"alice@example.com","avatarUrl":null}"#,
        )
        .unwrap();
        assert_eq!(profile.avatar_url, None);
    }
}
