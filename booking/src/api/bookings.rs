//! Booking read endpoints for the signed-in user.
//!
//! - GET /api/bookings - Own bookings with their event, newest first
//! - GET /api/bookings/:id - One own booking (receipt page)

use crate::auth::SessionUser;
use crate::server::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use clubpass_core::types::{BookingDetails, BookingId};
use clubpass_web::AppError;

/// List the caller's bookings.
pub async fn list_bookings(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let bookings = state
        .collaborators
        .bookings
        .list_for_user(session.user.id)
        .await
        .map_err(|e| AppError::internal("Failed to load bookings").with_source(e))?;

    Ok(Json(bookings))
}

/// Get one of the caller's bookings.
///
/// Bookings owned by someone else answer 404, like missing ones.
pub async fn get_booking(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<BookingDetails>, AppError> {
    let booking_id: BookingId = id
        .parse()
        .map_err(|_| AppError::bad_request("Invalid booking ID"))?;

    let details = state
        .collaborators
        .bookings
        .get(booking_id)
        .await
        .map_err(|e| AppError::internal("Failed to load booking").with_source(e))?
        .filter(|details| details.booking.user_id == session.user.id)
        .ok_or_else(|| AppError::not_found("Booking"))?;

    Ok(Json(details))
}
