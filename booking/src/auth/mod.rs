//! Authentication for the booking API.
//!
//! Sessions are issued by the hosted auth provider; this crate only
//! resolves bearer tokens through [`AuthProvider`](clubpass_core::auth::AuthProvider).
//!
//! # Usage
//!
//! ```rust,ignore
//! use booking::auth::SessionUser;
//!
//! async fn my_bookings(session: SessionUser) -> Result<Json<Vec<BookingDetails>>, AppError> {
//!     // session.user.id is the authenticated user
//! }
//! ```

mod supabase;

pub use supabase::SupabaseAuth;

use crate::server::AppState;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use clubpass_core::auth::AuthUser;
use clubpass_web::{AppError, BearerToken};

/// Authenticated session user.
///
/// Use as a handler parameter to require a valid bearer token; rejects with
/// 401 otherwise.
#[derive(Debug, Clone)]
pub struct SessionUser {
    /// The authenticated user
    pub user: AuthUser,
}

#[async_trait]
impl FromRequestParts<AppState> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;

        let user = state.auth.user_from_token(&token).await.map_err(|e| {
            tracing::debug!(error = %e, "Session lookup rejected");
            AppError::from(e)
        })?;

        Ok(Self { user })
    }
}
