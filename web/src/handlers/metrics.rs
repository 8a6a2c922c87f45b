//! Prometheus scrape endpoint.

use axum::{extract::State, http::header, response::IntoResponse};
use clubpass_runtime::metrics::MetricsRegistry;

/// `GET /metrics`
///
/// Works with any router state that exposes a [`MetricsRegistry`] through
/// `FromRef`.
#[allow(clippy::unused_async)]
pub async fn metrics_handler(State(registry): State<MetricsRegistry>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        registry.render(),
    )
}
