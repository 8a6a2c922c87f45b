//! Supabase Auth (GoTrue) client.

use async_trait::async_trait;
use clubpass_core::auth::{AuthProvider, AuthSession, AuthUser};
use clubpass_core::error::AuthError;
use clubpass_core::types::UserId;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// [`AuthProvider`] over the Supabase Auth REST API.
///
/// Every request carries the project's anon key in the `apikey` header.
///
/// # Example
///
/// ```no_run
/// use booking::auth::SupabaseAuth;
///
/// let auth = SupabaseAuth::new("https://project.supabase.co", "anon-key");
/// ```
#[derive(Clone, Debug)]
pub struct SupabaseAuth {
    url: String,
    anon_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

impl From<GoTrueUser> for AuthUser {
    fn from(user: GoTrueUser) -> Self {
        Self {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

/// Sign-up answers with the user, or with a session wrapping it when email
/// confirmation is disabled.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session { user: GoTrueUser },
    User(GoTrueUser),
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
    user: GoTrueUser,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
    }
}

impl SupabaseAuth {
    /// Create a client for the project at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            client: Client::new(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxies).
    #[must_use]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.url)
    }

    async fn error_message(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| format!("HTTP {status}"))
    }
}

fn request_failed(e: &reqwest::Error) -> AuthError {
    AuthError::Provider(format!("request failed: {e}"))
}

fn parse_failed(e: &reqwest::Error) -> AuthError {
    AuthError::Provider(format!("unexpected response: {e}"))
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn user_from_token(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| request_failed(&e))?;

        match response.status() {
            StatusCode::OK => response
                .json::<GoTrueUser>()
                .await
                .map(AuthUser::from)
                .map_err(|e| parse_failed(&e)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidToken),
            status => {
                let message = Self::error_message(response).await;
                tracing::warn!(%status, %message, "Session lookup failed");
                Err(AuthError::Provider(message))
            }
        }
    }

    #[tracing::instrument(skip(self, password, full_name))]
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .client
            .post(self.endpoint("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "full_name": full_name },
            }))
            .send()
            .await
            .map_err(|e| request_failed(&e))?;

        let status = response.status();
        if status.is_success() {
            let user = match response.json::<SignUpBody>().await.map_err(|e| parse_failed(&e))? {
                SignUpBody::Session { user } | SignUpBody::User(user) => user,
            };
            return Ok(user.into());
        }

        let message = Self::error_message(response).await;
        if status.is_client_error() {
            Err(AuthError::Rejected(message))
        } else {
            tracing::warn!(%status, %message, "Sign-up failed upstream");
            Err(AuthError::Provider(message))
        }
    }

    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .client
            .post(self.endpoint("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| request_failed(&e))?;

        match response.status() {
            StatusCode::OK => {
                let body = response
                    .json::<TokenBody>()
                    .await
                    .map_err(|e| parse_failed(&e))?;
                Ok(AuthSession {
                    access_token: body.access_token,
                    refresh_token: body.refresh_token,
                    expires_in: body.expires_in,
                    user: body.user.into(),
                })
            }
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => Err(AuthError::InvalidCredentials),
            status => {
                let message = Self::error_message(response).await;
                tracing::warn!(%status, %message, "Sign-in failed upstream");
                Err(AuthError::Provider(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let auth = SupabaseAuth::new("https://project.supabase.co/", "anon");
        assert_eq!(auth.endpoint("user"), "https://project.supabase.co/auth/v1/user");
    }

    #[test]
    fn test_error_message_preference() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Bad login"}"#)
                .unwrap_or_default();
        assert_eq!(body.into_message().as_deref(), Some("Bad login"));
    }
}
