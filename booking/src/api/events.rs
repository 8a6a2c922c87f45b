//! Event catalogue endpoints.
//!
//! - GET /api/events - Upcoming events, soonest first
//! - GET /api/events/:id - One event
//!
//! Public; rate limited under `api-general` per client.

use crate::server::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use clubpass_core::types::{Event, EventId};
use clubpass_runtime::EndpointClass;
use clubpass_web::{AppError, ClientIp};

fn check_rate(state: &AppState, ClientIp(ip): ClientIp) -> Result<(), AppError> {
    state
        .guards
        .rate
        .check(EndpointClass::ApiGeneral, &ip.to_string())
        .into_result()
        .map_err(AppError::from)
}

/// List upcoming events.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/api/events
/// ```
pub async fn list_events(
    State(state): State<AppState>,
    client_ip: ClientIp,
) -> Result<Json<Vec<Event>>, AppError> {
    check_rate(&state, client_ip)?;

    let now = state.collaborators.clock.now();
    let events = state
        .collaborators
        .events
        .list_upcoming(now)
        .await
        .map_err(|e| AppError::internal("Failed to load events").with_source(e))?;

    Ok(Json(events))
}

/// Get event details by ID.
pub async fn get_event(
    State(state): State<AppState>,
    client_ip: ClientIp,
    Path(id): Path<String>,
) -> Result<Json<Event>, AppError> {
    check_rate(&state, client_ip)?;

    let event_id: EventId = id
        .parse()
        .map_err(|_| AppError::bad_request("Invalid event ID"))?;

    let event = state
        .collaborators
        .events
        .get(event_id)
        .await
        .map_err(|e| AppError::internal("Failed to load event").with_source(e))?
        .ok_or_else(|| AppError::not_found("Event"))?;

    Ok(Json(event))
}
