//! Hosted auth provider abstraction.

use crate::error::AuthError;
use crate::types::UserId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// User resolved from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Provider user id
    pub id: UserId,
    /// Verified email
    pub email: String,
}

/// Session issued on sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token for API calls
    pub access_token: String,
    /// Token used to refresh the session
    pub refresh_token: String,
    /// Lifetime of the access token in seconds
    pub expires_in: u64,
    /// The signed-in user
    pub user: AuthUser,
}

/// External identity provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolve a bearer access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for unknown or expired tokens.
    async fn user_from_token(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] if the provider refuses (e.g. the
    /// email is taken).
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<AuthUser, AuthError>;

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on a wrong email/password.
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
}
