//! Application state for the booking HTTP server.
//!
//! Contains everything the handlers share:
//! - The three payment services
//! - Collaborators for the read endpoints
//! - Guard state for rate limiting the non-payment endpoints
//! - The auth provider and the readiness probe

use super::health::ReadinessCheck;
use crate::app::{
    Collaborators, ConfirmationVerifier, Guards, OrderOrchestrator, StaleBookingSweep,
    WebhookReconciler,
};
use crate::config::{Config, SweeperConfig};
use clubpass_core::auth::AuthProvider;
use clubpass_core::validation::ValidationLimits;
use clubpass_runtime::{Sweep, Sweeper};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is an `Arc` or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Cart → gateway order → pending booking
    pub orders: Arc<OrderOrchestrator>,
    /// Checkout confirmations
    pub verifier: Arc<ConfirmationVerifier>,
    /// Gateway webhooks
    pub webhooks: Arc<WebhookReconciler>,
    /// Repositories, gateway and clock
    pub collaborators: Collaborators,
    /// Per-process guard state
    pub guards: Guards,
    /// Resolves bearer tokens, signs users up and in
    pub auth: Arc<dyn AuthProvider>,
    /// Input bounds for the auth endpoints
    pub limits: ValidationLimits,
    /// Dependency probe for `/ready`
    pub readiness: Arc<dyn ReadinessCheck>,
}

impl AppState {
    /// Build the services over `collaborators` with in-memory guards.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        auth: Arc<dyn AuthProvider>,
        readiness: Arc<dyn ReadinessCheck>,
        config: &Config,
    ) -> Self {
        let guards = Guards::in_memory(
            &config.limits,
            config.rate_limits.clone(),
            &collaborators.clock,
        );
        let limits = config.limits.validation.clone();

        let orders = OrderOrchestrator::new(
            collaborators.clone(),
            guards.clone(),
            limits.clone(),
            config.razorpay.currency.clone(),
        );
        let verifier = ConfirmationVerifier::new(
            collaborators.clone(),
            guards.clone(),
            limits.clone(),
            config.razorpay.key_secret.clone(),
        );
        let webhooks = WebhookReconciler::new(
            collaborators.clone(),
            guards.clone(),
            config.razorpay.webhook_secret.clone(),
        );

        Self {
            orders: Arc::new(orders),
            verifier: Arc::new(verifier),
            webhooks: Arc::new(webhooks),
            collaborators,
            guards,
            auth,
            limits,
            readiness,
        }
    }

    /// Periodic cleanup over this state's guards and bookings.
    ///
    /// Not started; call [`Sweeper::start`] and keep the handle for shutdown.
    #[must_use]
    pub fn sweeper(&self, config: &SweeperConfig) -> Sweeper {
        let stale: Arc<dyn Sweep> = Arc::new(StaleBookingSweep::new(
            Arc::clone(&self.collaborators.bookings),
            Arc::clone(&self.collaborators.clock),
            config.stale_booking_age,
        ));

        Sweeper::new()
            .with_task(self.guards.rate.clone(), config.rate_limit_interval)
            .with_task(self.guards.activity.clone(), config.rate_limit_interval)
            .with_task(self.guards.attempts.clone(), config.ledger_interval)
            .with_task(self.guards.orders.clone(), config.ledger_interval)
            .with_task(stale, config.stale_booking_interval)
    }
}
