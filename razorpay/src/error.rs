//! Error types for the Razorpay client

use clubpass_core::error::GatewayError;
use thiserror::Error;

/// Errors that can occur when interacting with Razorpay
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RazorpayError {
    /// HTTP request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Unauthorized - wrong key id or secret
    #[error("Unauthorized - invalid API credentials")]
    Unauthorized,

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error description from the API
        message: String,
    },

    /// Webhook body is not a readable event
    #[error("Malformed webhook: {0}")]
    MalformedWebhook(String),
}

impl From<RazorpayError> for GatewayError {
    fn from(err: RazorpayError) -> Self {
        match err {
            RazorpayError::RequestFailed(msg) => Self::RequestFailed(msg),
            RazorpayError::ResponseParseFailed(msg) | RazorpayError::MalformedWebhook(msg) => {
                Self::ResponseParseFailed(msg)
            }
            RazorpayError::Unauthorized => Self::Rejected {
                status: 401,
                message: "invalid API credentials".to_string(),
            },
            RazorpayError::ApiError { status, message } => Self::Rejected { status, message },
        }
    }
}
