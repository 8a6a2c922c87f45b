//! Correlation id middleware.
//!
//! Installed with `axum::middleware::from_fn(track_correlation)` as the
//! outermost layer, so every log line of a request (including the
//! `TraceLayer` ones) lands inside one `http_request` span.

use crate::extractors::CorrelationId;
use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the correlation id, both ways.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Accept the caller's id when it is a UUID, otherwise mint one.
fn inbound_id(headers: &HeaderMap) -> Uuid {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .unwrap_or_else(Uuid::new_v4)
}

/// Tag the request with a correlation id and echo it on the response.
///
/// The span records the path only; query strings never reach the logs.
pub async fn track_correlation(mut req: Request, next: Next) -> Response {
    let id = inbound_id(req.headers());
    req.extensions_mut().insert(CorrelationId(id));

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = next.run(req).instrument(span).await;
    // A hyphenated UUID is always a valid header value.
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
