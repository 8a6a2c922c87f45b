//! Axum integration for the Clubpass booking core.
//!
//! The application crate owns routes and state; this crate supplies the
//! pieces every handler shares:
//!
//! - [`AppError`]: maps [`BookingError`](clubpass_core::BookingError) onto
//!   status codes and a JSON body `{error, code, details?, retryAfter?}`
//! - Extractors: [`ClientIp`], [`UserAgent`], [`CorrelationId`], [`BearerToken`]
//! - [`track_correlation`]: `http_request` span per request and the
//!   `X-Correlation-ID` response header
//! - Liveness and Prometheus handlers
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract** token, client identifier and JSON body
//! 3. **Call** the booking service
//! 4. **Map** `BookingError` to `AppError` with `?`
//!
//! # Example
//!
//! ```ignore
//! use clubpass_web::{AppError, BearerToken, ClientIp};
//! use axum::{Router, routing::post, Json};
//!
//! async fn create_order(
//!     State(state): State<AppState>,
//!     token: BearerToken,
//!     client_ip: ClientIp,
//!     Json(request): Json<CreateOrderRequest>,
//! ) -> Result<Json<CreateOrderResponse>, AppError> {
//!     let user = state.auth.user_from_token(&token.0).await?;
//!     Ok(Json(state.orders.create(user, request, client_ip).await?))
//! }
//!
//! let app = Router::new()
//!     .route("/api/payment/create-order", post(create_order))
//!     .layer(axum::middleware::from_fn(track_correlation))
//!     .with_state(app_state);
//! ```

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use extractors::{BearerToken, ClientIp, CorrelationId, UserAgent};
pub use middleware::{CORRELATION_ID_HEADER, track_correlation};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
