//! Shared wiring for the service tests.

#![allow(clippy::unwrap_used)]

use super::{
    Collaborators, ConfirmationVerifier, CreateOrderRequest, Guards, OrderOrchestrator,
    RequestContext, WebhookReconciler,
};
use super::orchestrator::CartRequest;
use crate::config::LimitsConfig;
use clubpass_core::auth::AuthUser;
use clubpass_core::environment::Clock;
use clubpass_core::types::{Event, Profile};
use clubpass_runtime::RateLimitRules;
use clubpass_testing::{
    InMemoryBookingRepository, InMemoryEventRepository, InMemoryProfileRepository, ManualClock,
    MockPaymentGateway, fixtures,
};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

pub const KEY_SECRET: &str = "test_key_secret";
pub const WEBHOOK_SECRET: &str = "test_webhook_secret";

pub struct Harness {
    pub events: InMemoryEventRepository,
    pub bookings: InMemoryBookingRepository,
    pub gateway: MockPaymentGateway,
    pub clock: ManualClock,
    pub collaborators: Collaborators,
    pub guards: Guards,
    pub event: Event,
    pub profile: Profile,
}

impl Harness {
    pub fn new() -> Self {
        let events = InMemoryEventRepository::new();
        let event = fixtures::event();
        events.add(event.clone());

        let profiles = InMemoryProfileRepository::new();
        let profile = fixtures::profile();
        profiles.add(profile.clone());

        let bookings = InMemoryBookingRepository::new(events.clone());
        let gateway = MockPaymentGateway::new();
        let clock = ManualClock::default();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

        let collaborators = Collaborators {
            events: Arc::new(events.clone()),
            profiles: Arc::new(profiles),
            bookings: Arc::new(bookings.clone()),
            gateway: Arc::new(gateway.clone()),
            clock: Arc::clone(&shared_clock),
        };
        let guards = Guards::in_memory(
            &LimitsConfig::default(),
            RateLimitRules::default(),
            &shared_clock,
        );

        Self {
            events,
            bookings,
            gateway,
            clock,
            collaborators,
            guards,
            event,
            profile,
        }
    }

    pub fn user(&self) -> AuthUser {
        AuthUser {
            id: self.profile.id,
            email: self.profile.email.clone(),
        }
    }

    pub fn ctx() -> RequestContext {
        RequestContext::new(
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)),
            "Mozilla/5.0 (Test)",
            "/api/payment/create-order",
        )
    }

    pub fn order_request(&self, women: u32, couple: u32, stag: u32, total: f64) -> CreateOrderRequest {
        CreateOrderRequest {
            event_id: Some(self.event.id.to_string()),
            user_id: Some(self.profile.id.to_string()),
            cart: Some(CartRequest {
                women: Some(f64::from(women)),
                couple: Some(f64::from(couple)),
                stag: Some(f64::from(stag)),
            }),
            total_amount: Some(total),
        }
    }

    pub fn orchestrator(&self) -> OrderOrchestrator {
        OrderOrchestrator::new(
            self.collaborators.clone(),
            self.guards.clone(),
            LimitsConfig::default().validation,
            "INR",
        )
    }

    pub fn verifier(&self) -> ConfirmationVerifier {
        ConfirmationVerifier::new(
            self.collaborators.clone(),
            self.guards.clone(),
            LimitsConfig::default().validation,
            KEY_SECRET,
        )
    }

    pub fn reconciler(&self) -> WebhookReconciler {
        WebhookReconciler::new(self.collaborators.clone(), self.guards.clone(), WEBHOOK_SECRET)
    }
}
