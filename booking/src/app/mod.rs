//! Booking services.
//!
//! This module wires the collaborators and guards into the three payment
//! paths:
//! - [`OrderOrchestrator`]: cart → gateway order → `pending` booking
//! - [`ConfirmationVerifier`]: signed checkout callback → `confirmed`
//! - [`WebhookReconciler`]: signed gateway push → `confirmed` / `failed`
//!
//! plus [`StaleBookingSweep`], which fails bookings whose payment never
//! arrived.

mod context;
mod orchestrator;
mod reconciler;
mod stale;
mod transitions;
mod verifier;

#[cfg(test)]
mod test_support;

pub use context::RequestContext;
pub use orchestrator::{CartRequest, CreateOrderRequest, OrderCreated, OrderOrchestrator};
pub use reconciler::{WebhookOutcome, WebhookReconciler};
pub use stale::{STALE_BOOKING_REASON, StaleBookingSweep};
pub use transitions::{Settled, settle};
pub use verifier::{ConfirmationVerifier, VerifyPaymentRequest, VerifiedPayment};

use crate::config::LimitsConfig;
use clubpass_core::environment::Clock;
use clubpass_core::gateway::PaymentGateway;
use clubpass_core::repository::{BookingRepository, EventRepository, ProfileRepository};
use clubpass_runtime::activity::ActivityConfig;
use clubpass_runtime::{
    ActivityDetector, OrderLedger, PaymentAttemptLedger, PaymentSecurity, RateGuard,
    RateLimitRules,
};
use std::sync::Arc;

/// External collaborators shared by every service.
#[derive(Clone)]
pub struct Collaborators {
    /// Event catalogue
    pub events: Arc<dyn EventRepository>,
    /// User profiles
    pub profiles: Arc<dyn ProfileRepository>,
    /// Booking rows
    pub bookings: Arc<dyn BookingRepository>,
    /// Payment gateway
    pub gateway: Arc<dyn PaymentGateway>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

/// Per-process guard state.
#[derive(Clone)]
pub struct Guards {
    /// Endpoint quotas
    pub rate: Arc<RateGuard>,
    /// Request heuristics
    pub activity: Arc<ActivityDetector>,
    /// Amount and pattern heuristics
    pub payment: PaymentSecurity,
    /// Payment attempts per (user, event, amount)
    pub attempts: Arc<PaymentAttemptLedger>,
    /// Gateway orders per (user, event, amount)
    pub orders: Arc<OrderLedger>,
}

impl Guards {
    /// Guards backed by in-memory stores.
    #[must_use]
    pub fn in_memory(limits: &LimitsConfig, rules: RateLimitRules, clock: &Arc<dyn Clock>) -> Self {
        Self {
            rate: Arc::new(RateGuard::in_memory(rules, Arc::clone(clock))),
            activity: Arc::new(ActivityDetector::in_memory(
                ActivityConfig::default(),
                Arc::clone(clock),
            )),
            payment: PaymentSecurity::new(limits.payment.clone()),
            attempts: Arc::new(PaymentAttemptLedger::in_memory(
                limits.ledger.clone(),
                Arc::clone(clock),
            )),
            orders: Arc::new(OrderLedger::in_memory(&limits.ledger, Arc::clone(clock))),
        }
    }
}
