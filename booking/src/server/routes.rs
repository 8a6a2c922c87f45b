//! Router configuration for the booking service.

use super::health::readiness_check;
use super::state::AppState;
use crate::api::{auth, bookings, events, payments, webhook};
use axum::{
    Router,
    routing::{get, post},
};
use clubpass_runtime::metrics::MetricsRegistry;
use clubpass_web::track_correlation;
use clubpass_web::handlers::{health_check, metrics_handler};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `GET /health`, `GET /ready`
/// - `/api/payment/*`: order creation, checkout verification, webhook
/// - `/api/events`, `/api/bookings`: read endpoints
/// - `/api/auth/*`: sign-up and sign-in through the auth provider
/// - `GET /metrics` when a registry is given
pub fn build_router(state: AppState, metrics: Option<MetricsRegistry>) -> Router {
    let api_routes = Router::new()
        // Payments
        .route("/payment/create-order", post(payments::create_order))
        .route("/payment/verify", post(payments::verify_payment))
        .route("/payment/webhook", post(webhook::razorpay_webhook))
        // Events
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::get_event))
        // Bookings
        .route("/bookings", get(bookings::list_bookings))
        .route("/bookings/:id", get(bookings::get_booking))
        // Auth
        .route("/auth/signup", post(auth::sign_up))
        .route("/auth/signin", post(auth::sign_in));

    let mut router = Router::new()
        // Health checks (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .with_state(state);

    if let Some(registry) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", get(metrics_handler))
                .with_state(registry),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(axum::middleware::from_fn(track_correlation))
}
