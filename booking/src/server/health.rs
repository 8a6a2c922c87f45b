//! Readiness endpoint.
//!
//! Liveness (`/health`) comes from `clubpass-web`; readiness also checks the
//! database.

use super::state::AppState;
use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use sqlx::PgPool;

/// A dependency the service needs before it can take traffic.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// `Ok` when reachable; otherwise a description of the failure.
    async fn check(&self) -> Result<(), String>;
}

#[async_trait]
impl ReadinessCheck for PgPool {
    async fn check(&self) -> Result<(), String> {
        clubpass_postgres::ping(self).await.map_err(|e| e.to_string())
    }
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness status
    pub ready: bool,
    /// Database connectivity
    pub database: bool,
}

/// Readiness check endpoint.
///
/// Returns 200 when the database answers, 503 otherwise. Used by
/// orchestrator readiness probes.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/ready
/// # {"ready":true,"database":true}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database = match state.readiness.check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            false
        }
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: database,
            database,
        }),
    )
}
