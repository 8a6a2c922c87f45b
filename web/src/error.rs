//! Error types for web handlers.
//!
//! [`AppError`] bridges [`BookingError`] and HTTP responses. Every error
//! renders as
//!
//! ```json
//! {"error": "...", "code": "RATE_LIMITED", "details": ..., "retryAfter": 42}
//! ```
//!
//! where `details` and `retryAfter` are omitted when empty. A 429 also
//! carries a `Retry-After` header.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use clubpass_core::error::{AuthError, BookingError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Application error type for web handlers.
///
/// Client-facing fields only; the optional `source` is logged for server
/// errors and never serialized.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Event>, AppError> {
///     let event = service.event(id).await?; // BookingError -> AppError
///     Ok(Json(event))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: &'static str,
    /// Structured details (field errors, existing order id)
    details: Option<Value>,
    /// Seconds until the client may retry
    retry_after: Option<u64>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            details: None,
            retry_after: None,
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "UNAUTHORIZED")
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message, "FORBIDDEN")
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} not found"),
            "NOT_FOUND",
        )
    }

    /// Create a 429 Too Many Requests error.
    #[must_use]
    pub fn rate_limited(retry_after_secs: u64) -> Self {
        let mut err = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            format!("Too many requests. Try again in {retry_after_secs} seconds"),
            "RATE_LIMITED",
        );
        err.retry_after = Some(retry_after_secs);
        err
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message,
            "INTERNAL_SERVER_ERROR",
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Client-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let retry_after = self.retry_after;
        let body = ErrorResponse {
            error: self.message,
            code: self.code,
            details: self.details,
            retry_after,
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(errors) => {
                let details = serde_json::to_value(&errors).unwrap_or(Value::Null);
                Self::new(StatusCode::BAD_REQUEST, "Validation failed", "VALIDATION_ERROR")
                    .with_details(details)
            }
            BookingError::Unauthorized(message) => Self::unauthorized(message),
            BookingError::Forbidden(message) => Self::forbidden(message),
            BookingError::RateLimited { retry_after_secs } => Self::rate_limited(retry_after_secs),
            BookingError::Duplicate {
                reason,
                existing_order_id,
            } => {
                let err = Self::new(StatusCode::CONFLICT, reason, "DUPLICATE_PAYMENT");
                match existing_order_id {
                    Some(order_id) => {
                        err.with_details(serde_json::json!({ "existingOrderId": order_id }))
                    }
                    None => err,
                }
            }
            BookingError::SecurityViolation(reason) => {
                Self::new(StatusCode::BAD_REQUEST, reason, "SECURITY_VIOLATION")
            }
            BookingError::AmountMismatch { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "Amount mismatch", "AMOUNT_MISMATCH")
            }
            BookingError::NotFound { resource, .. } => Self::not_found(resource),
            err @ BookingError::InvalidTransition { .. } => {
                Self::new(StatusCode::CONFLICT, err.to_string(), "INVALID_STATE")
            }
            BookingError::Signature => Self::new(
                StatusCode::BAD_REQUEST,
                "Invalid payment signature",
                "INVALID_SIGNATURE",
            ),
            BookingError::Gateway(err) => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create payment order",
                "GATEWAY_ERROR",
            )
            .with_source(err),
            BookingError::Persistence(err) => {
                Self::internal("Internal server error").with_source(err)
            }
            BookingError::Auth(err) => Self::from(err),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => Self::unauthorized("Invalid or expired session"),
            AuthError::InvalidCredentials => Self::unauthorized("Invalid email or password"),
            AuthError::Rejected(message) => {
                Self::new(StatusCode::BAD_REQUEST, message, "AUTH_REJECTED")
            }
            err @ AuthError::Provider(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                "Authentication service unavailable",
                "AUTH_PROVIDER_ERROR",
            )
            .with_source(err),
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("Internal server error").with_source(err)
    }
}
