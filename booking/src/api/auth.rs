//! Account endpoints.
//!
//! - POST /api/auth/signup - Register with email, password and full name
//! - POST /api/auth/signin - Exchange credentials for a session
//!
//! Both validate input, apply their own rate limit class, then delegate to
//! the hosted auth provider.

use super::json_body;
use crate::server::AppState;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use clubpass_core::auth::{AuthSession, AuthUser};
use clubpass_core::types::Profile;
use clubpass_core::validation::{ValidationResult, sanitize_db_input};
use clubpass_runtime::EndpointClass;
use clubpass_web::{AppError, ClientIp};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Sign-up request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Password
    #[serde(default)]
    pub password: String,
    /// Full name
    #[serde(default)]
    pub full_name: String,
}

/// Sign-up response.
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    /// The new user
    pub user: AuthUser,
    /// Next step for the client
    pub message: String,
}

/// Sign-in request.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Password
    #[serde(default)]
    pub password: String,
}

/// Register a new account.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/auth/signup \
///   -H "Content-Type: application/json" \
///   -d '{"email": "asha@example.com", "password": "nightout42", "fullName": "Asha Rao"}'
/// ```
pub async fn sign_up(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SignUpResponse>), AppError> {
    let request = json_body(body)?;
    let email = request.email.trim().to_lowercase();
    let full_name = sanitize_db_input(&request.full_name);

    ValidationResult::combine([
        state.limits.email(&email),
        state.limits.password(&request.password),
        state.limits.full_name(&full_name),
    ])
    .into_result()?;

    state
        .guards
        .rate
        .check(EndpointClass::AuthSignup, &ip.to_string())
        .into_result()?;

    let user = state
        .auth
        .sign_up(&email, &request.password, &full_name)
        .await?;

    let profile = Profile {
        id: user.id,
        email: user.email.clone(),
        full_name: Some(full_name),
    };
    if let Err(e) = state.collaborators.profiles.upsert(&profile).await {
        // The account exists upstream; the checkout falls back to the email.
        warn!(user_id = %user.id, error = %e, "Could not store profile");
    }

    info!(user_id = %user.id, "User signed up");
    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            user,
            message: "Account created".to_string(),
        }),
    ))
}

/// Sign in with email and password.
pub async fn sign_in(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<Json<AuthSession>, AppError> {
    let request = json_body(body)?;
    let email = request.email.trim().to_lowercase();

    let mut result = state.limits.email(&email);
    if request.password.is_empty() {
        result.add_error("password", "Password is required");
    }
    result.into_result()?;

    state
        .guards
        .rate
        .check(EndpointClass::AuthSignin, &ip.to_string())
        .into_result()?;

    let session = state.auth.sign_in(&email, &request.password).await?;
    info!(user_id = %session.user.id, "User signed in");
    Ok(Json(session))
}
