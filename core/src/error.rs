//! Error types for the booking core.
//!
//! [`BookingError`] is the taxonomy every service operation returns. The web
//! layer maps each variant onto an HTTP status; collaborator errors
//! ([`RepositoryError`], [`GatewayError`], [`AuthError`]) convert into it.

use crate::types::{BookingStatus, Money};
use crate::validation::FieldError;
use thiserror::Error;

/// Errors from the relational store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Query or connection failure
    #[error("Database error: {0}")]
    Database(String),
    /// A unique constraint was violated
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A row could not be mapped onto a domain type
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Errors from the payment gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Request could not be sent or timed out
    #[error("Gateway request failed: {0}")]
    RequestFailed(String),
    /// Gateway answered with an error status
    #[error("Gateway rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the gateway
        status: u16,
        /// Error description from the gateway
        message: String,
    },
    /// Gateway answered with a body we could not parse
    #[error("Failed to parse gateway response: {0}")]
    ResponseParseFailed(String),
}

/// Errors from the hosted auth provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Missing, expired or unknown access token
    #[error("Invalid or expired session")]
    InvalidToken,
    /// Wrong email/password
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Provider refused the request (e.g. email already registered)
    #[error("{0}")]
    Rejected(String),
    /// Provider unreachable or answered unexpectedly
    #[error("Auth provider error: {0}")]
    Provider(String),
}

/// Errors returned by booking operations.
#[derive(Error, Debug)]
pub enum BookingError {
    /// Input failed field validation (400)
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    /// No valid session (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Session user may not act on this resource (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Too many requests for this endpoint class (429)
    #[error("Too many requests. Try again in {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds until the client may retry (≥ 1)
        retry_after_secs: u64,
    },

    /// A matching payment attempt or order is in flight or done (409)
    #[error("{reason}")]
    Duplicate {
        /// Client-facing reason
        reason: String,
        /// Order id already issued for the same attempt, when known
        existing_order_id: Option<String>,
    },

    /// Request tripped a security heuristic (400)
    #[error("{0}")]
    SecurityViolation(String),

    /// Client total disagrees with the server computation (400)
    #[error("Amount mismatch: expected {expected}, got {claimed}")]
    AmountMismatch {
        /// Server-computed total
        expected: Money,
        /// Total claimed by the client
        claimed: Money,
    },

    /// Referenced entity does not exist (404)
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of resource
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Booking is in a state that forbids the requested change (409)
    #[error("Booking is already {current}")]
    InvalidTransition {
        /// Status found in the store
        current: BookingStatus,
    },

    /// Checkout or webhook signature did not verify (400)
    #[error("Invalid payment signature")]
    Signature,

    /// Payment gateway failure (500/502)
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Store failure (500)
    #[error(transparent)]
    Persistence(#[from] RepositoryError),

    /// Auth provider failure
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl BookingError {
    /// Shorthand for a single-field validation failure.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Shorthand for [`BookingError::NotFound`].
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message() {
        let err = BookingError::RateLimited { retry_after_secs: 42 };
        assert_eq!(err.to_string(), "Too many requests. Try again in 42 seconds");
    }

    #[test]
    fn test_collaborator_errors_convert() {
        let err: BookingError = GatewayError::RequestFailed("timeout".to_string()).into();
        assert!(matches!(err, BookingError::Gateway(_)));

        let err: BookingError = RepositoryError::Database("down".to_string()).into();
        assert_eq!(err.to_string(), "Database error: down");
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = BookingError::InvalidTransition {
            current: BookingStatus::Failed,
        };
        assert_eq!(err.to_string(), "Booking is already failed");
    }
}
