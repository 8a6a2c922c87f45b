//! API endpoints for the booking service.
//!
//! Handlers organized by domain:
//! - Payments: order creation and checkout verification
//! - Webhook: gateway push notifications
//! - Events: public event catalogue
//! - Bookings: the signed-in user's bookings
//! - Auth: sign-up and sign-in

pub mod auth;
pub mod bookings;
pub mod events;
pub mod payments;
pub mod webhook;

use crate::app::RequestContext;
use axum::{Json, extract::rejection::JsonRejection};
use clubpass_web::{AppError, ClientIp, UserAgent};

/// Unwrap a JSON body, turning parse failures into the uniform 400.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        AppError::bad_request("Invalid JSON body")
    })
}

fn request_context(ClientIp(ip): ClientIp, UserAgent(user_agent): UserAgent, path: &str) -> RequestContext {
    RequestContext::new(ip, user_agent, path)
}
