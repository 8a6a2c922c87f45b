//! Payment endpoints.
//!
//! - POST /api/payment/create-order - Create a gateway order and pending booking (requires auth)
//! - POST /api/payment/verify - Verify a checkout confirmation

use super::{json_body, request_context};
use crate::app::{CreateOrderRequest, OrderCreated, VerifiedPayment, VerifyPaymentRequest};
use crate::auth::SessionUser;
use crate::server::AppState;
use axum::{
    Json,
    extract::{OriginalUri, State, rejection::JsonRejection},
};
use clubpass_web::{AppError, ClientIp, UserAgent};

/// Create a payment order for a cart.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/payment/create-order \
///   -H "Authorization: Bearer <access_token>" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "eventId": "550e8400-e29b-41d4-a716-446655440000",
///     "userId": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
///     "cart": {"women": 2, "couple": 1, "stag": 0},
///     "totalAmount": 1900
///   }'
/// ```
pub async fn create_order(
    State(state): State<AppState>,
    session: SessionUser,
    client_ip: ClientIp,
    user_agent: UserAgent,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Json<OrderCreated>, AppError> {
    let request = json_body(body)?;
    let ctx = request_context(client_ip, user_agent, uri.path());

    let created = state.orders.create_order(&session.user, request, &ctx).await?;
    Ok(Json(created))
}

/// Verify the signed checkout callback and confirm the booking.
///
/// Safe to call more than once for the same payment.
pub async fn verify_payment(
    State(state): State<AppState>,
    client_ip: ClientIp,
    user_agent: UserAgent,
    OriginalUri(uri): OriginalUri,
    body: Result<Json<VerifyPaymentRequest>, JsonRejection>,
) -> Result<Json<VerifiedPayment>, AppError> {
    let request = json_body(body)?;
    let ctx = request_context(client_ip, user_agent, uri.path());

    let verified = state.verifier.verify(request, &ctx).await?;
    Ok(Json(verified))
}
