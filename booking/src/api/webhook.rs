//! Razorpay webhook endpoint.
//!
//! The body is taken raw: the signature covers the exact bytes sent.

use crate::app::WebhookOutcome;
use crate::server::AppState;
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use clubpass_core::error::BookingError;
use clubpass_razorpay::signature::WEBHOOK_SIGNATURE_HEADER;
use clubpass_web::AppError;
use serde::Serialize;

/// Acknowledgement returned for every verified delivery.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// Always `true`
    pub success: bool,
}

/// `POST /api/payment/webhook`
///
/// Returns 400 for a missing or invalid signature. Verified deliveries are
/// acknowledged with 200 even when nothing was applied, so the gateway does
/// not redeliver events this service will never act on.
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing signature"))?;

    let outcome = state
        .webhooks
        .handle(&body, signature)
        .await
        .map_err(|e| match e {
            BookingError::Signature => AppError::bad_request("Invalid signature"),
            other => AppError::from(other),
        })?;

    if let WebhookOutcome::Failed { reason } = &outcome {
        tracing::error!(%reason, "Webhook acknowledged without being applied");
    }

    Ok(Json(WebhookAck { success: true }))
}
