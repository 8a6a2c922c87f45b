//! Order creation.
//!
//! Turns a client cart into a gateway order and a `pending` booking. The
//! order of checks matters: cheap stateless validation first, then the rate
//! guard, heuristics and dedup ledgers, and only then the store and the
//! gateway. Once an attempt is registered, every exit either releases it or
//! marks it failed.

use super::{Collaborators, Guards, RequestContext};
use clubpass_core::auth::AuthUser;
use clubpass_core::error::BookingError;
use clubpass_core::gateway::OrderRequest;
use clubpass_core::types::{BookingId, Event, EventId, Money, NewBooking, TicketCounts, UserId};
use clubpass_core::validation::{ValidationLimits, ValidationResult, validate_uuid};
use clubpass_runtime::ledger::{AttemptKey, AttemptStatus};
use clubpass_runtime::metrics::PaymentMetrics;
use clubpass_runtime::rate_limit::EndpointClass;
use clubpass_runtime::RiskLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

/// Largest gap tolerated between the claimed and computed total.
const AMOUNT_TOLERANCE: Money = Money::from_paise(1);

/// Cart as sent by the client: tier → count.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartRequest {
    /// Women tickets
    pub women: Option<f64>,
    /// Couple tickets
    pub couple: Option<f64>,
    /// Stag tickets
    pub stag: Option<f64>,
}

/// `POST /api/payment/create-order` body.
///
/// Every field is optional at the serde level so missing fields surface as
/// itemized validation errors instead of a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Event to book
    pub event_id: Option<String>,
    /// Booking user; must match the session
    pub user_id: Option<String>,
    /// Ticket counts
    pub cart: Option<CartRequest>,
    /// Total the client displayed, in rupees
    pub total_amount: Option<f64>,
}

/// Order details for the checkout widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    /// Gateway order id
    pub order_id: String,
    /// Amount in paise
    pub amount: Money,
    /// ISO currency code
    pub currency: String,
    /// Merchant receipt
    pub receipt: String,
    /// The `pending` booking
    pub booking_id: BookingId,
    /// Event title for the checkout description
    pub event_title: String,
    /// Prefill name for the checkout form
    pub user_name: String,
}

#[derive(Debug)]
struct ValidOrder {
    event_id: EventId,
    tickets: TicketCounts,
    claimed: Money,
}

#[derive(Debug)]
struct Priced {
    event: Event,
    total: Money,
    user_name: String,
}

/// Creates gateway orders and their `pending` bookings.
#[derive(Clone)]
pub struct OrderOrchestrator {
    collaborators: Collaborators,
    guards: Guards,
    limits: ValidationLimits,
    currency: String,
}

impl OrderOrchestrator {
    /// Create an orchestrator issuing orders in `currency`.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        guards: Guards,
        limits: ValidationLimits,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            collaborators,
            guards,
            limits,
            currency: currency.into(),
        }
    }

    /// Create an order for `user`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for malformed input or an empty cart
    /// - [`BookingError::Forbidden`] if the body names another user
    /// - [`BookingError::RateLimited`] past the `payment-create` quota
    /// - [`BookingError::SecurityViolation`] when a heuristic rejects the request
    /// - [`BookingError::Duplicate`] for a repeated submission
    /// - [`BookingError::NotFound`] for an unknown event
    /// - [`BookingError::AmountMismatch`] if the claimed total is wrong
    /// - [`BookingError::Gateway`] / [`BookingError::Persistence`] on
    ///   collaborator failure
    #[instrument(skip_all, fields(user_id = %user.id, client = %ctx.client_id))]
    pub async fn create_order(
        &self,
        user: &AuthUser,
        request: CreateOrderRequest,
        ctx: &RequestContext,
    ) -> Result<OrderCreated, BookingError> {
        let result = self.try_create_order(user, request, ctx).await;
        match &result {
            Ok(created) => {
                PaymentMetrics::record_order_created();
                info!(
                    order_id = %created.order_id,
                    booking_id = %created.booking_id,
                    amount = created.amount.paise(),
                    "Order created"
                );
            }
            Err(e) => {
                PaymentMetrics::record_order_rejected(rejection_reason(e));
                if matches!(e, BookingError::Validation(_) | BookingError::RateLimited { .. }) {
                    info!(error = %e, "Order request rejected");
                } else {
                    warn!(error = %e, "Order request rejected");
                }
            }
        }
        result
    }

    async fn try_create_order(
        &self,
        user: &AuthUser,
        request: CreateOrderRequest,
        ctx: &RequestContext,
    ) -> Result<OrderCreated, BookingError> {
        let order = self.validate(user, request)?;

        // The client identifier comes from forwarding headers a caller can
        // rotate; the session user cannot.
        let rate = &self.guards.rate;
        rate.check(EndpointClass::PaymentCreate, &ctx.client_id)
            .into_result()?;
        rate.check(EndpointClass::PaymentCreate, &format!("user:{}", user.id))
            .into_result()?;

        self.screen(user.id, &order, ctx)?;

        let key = AttemptKey::new(user.id, order.event_id, order.claimed);
        self.claim(&key)?;

        let priced = match self.price(user, &order).await {
            Ok(priced) => priced,
            Err(e) => {
                self.guards.attempts.release(&key);
                return Err(e);
            }
        };

        // Verification keys the ledger by the stored total, so the attempt
        // must follow the server price rather than the claim.
        let key = if priced.total == order.claimed {
            key
        } else {
            self.guards.attempts.release(&key);
            let priced_key = AttemptKey::new(user.id, order.event_id, priced.total);
            self.claim(&priced_key)?;
            priced_key
        };

        self.place(user, order, priced, &key).await
    }

    /// Duplicate order check, then the atomic attempt `begin`.
    fn claim(&self, key: &AttemptKey) -> Result<(), BookingError> {
        if let Some(existing) = self.guards.orders.check_duplicate_order(key) {
            return Err(BookingError::Duplicate {
                reason: "Duplicate order detected, please wait before retrying".to_string(),
                existing_order_id: Some(existing),
            });
        }
        self.guards.attempts.begin(key.clone())
    }

    fn validate(&self, user: &AuthUser, request: CreateOrderRequest) -> Result<ValidOrder, BookingError> {
        let event_id = request.event_id.unwrap_or_default();
        let user_id = request.user_id.unwrap_or_default();
        let cart = request.cart.unwrap_or_default();

        let amount = request.total_amount.map_or_else(
            || ValidationResult::invalid("totalAmount", "Amount is required"),
            |amount| self.limits.amount(amount, "totalAmount"),
        );
        ValidationResult::combine([
            validate_uuid(&event_id, "eventId"),
            validate_uuid(&user_id, "userId"),
            self.limits.ticket_count(cart.women.unwrap_or(0.0), "cart.women"),
            self.limits.ticket_count(cart.couple.unwrap_or(0.0), "cart.couple"),
            self.limits.ticket_count(cart.stag.unwrap_or(0.0), "cart.stag"),
            amount,
        ])
        .into_result()?;

        let tickets = TicketCounts {
            women: whole(cart.women),
            couple: whole(cart.couple),
            stag: whole(cart.stag),
        };
        if !tickets.is_payable() {
            return Err(BookingError::invalid("cart", "At least one ticket is required"));
        }

        let body_user: UserId = user_id
            .parse()
            .map_err(|_| BookingError::invalid("userId", "Invalid ID format"))?;
        if body_user != user.id {
            return Err(BookingError::Forbidden(
                "Cannot create an order for another user".to_string(),
            ));
        }

        Ok(ValidOrder {
            event_id: event_id
                .parse()
                .map_err(|_| BookingError::invalid("eventId", "Invalid ID format"))?,
            tickets,
            claimed: request
                .total_amount
                .and_then(Money::try_from_rupees)
                .ok_or_else(|| BookingError::invalid("totalAmount", "Invalid amount"))?,
        })
    }

    /// Activity and payment heuristics. Reasons are logged, not returned.
    fn screen(&self, user_id: UserId, order: &ValidOrder, ctx: &RequestContext) -> Result<(), BookingError> {
        let activity = self.guards.activity.record(
            &ctx.client_id,
            Some(&ctx.user_agent),
            Some(&ctx.path),
        );
        if activity.risk == RiskLevel::High {
            warn!(reason = ?activity.reason, "Suspicious activity blocked");
            return Err(BookingError::SecurityViolation(
                "Request blocked for security reasons".to_string(),
            ));
        }

        let violations = self.guards.payment.check_amount(order.claimed);
        if !violations.is_empty() {
            warn!(?violations, amount = order.claimed.paise(), "Payment amount rejected");
            return Err(BookingError::SecurityViolation(
                "Payment amount not allowed".to_string(),
            ));
        }

        let pattern = self.guards.payment.assess_pattern(
            &self.guards.attempts.attempts(),
            user_id,
            order.claimed,
            self.collaborators.clock.now(),
        );
        if pattern.risk == RiskLevel::High {
            warn!(reasons = ?pattern.reasons, "Suspicious payment pattern blocked");
            return Err(BookingError::SecurityViolation(
                "Suspicious payment activity detected".to_string(),
            ));
        }
        Ok(())
    }

    async fn price(&self, user: &AuthUser, order: &ValidOrder) -> Result<Priced, BookingError> {
        let event = self
            .collaborators
            .events
            .get(order.event_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Event", order.event_id))?;

        let total = order
            .tickets
            .total(&event.prices)
            .ok_or_else(|| BookingError::invalid("cart", "Cart total is out of range"))?;
        if total.abs_diff(order.claimed) > AMOUNT_TOLERANCE {
            return Err(BookingError::AmountMismatch {
                expected: total,
                claimed: order.claimed,
            });
        }

        let user_name = self
            .collaborators
            .profiles
            .get(user.id)
            .await?
            .map_or_else(|| user.email.clone(), |p| p.display_name().to_string());

        Ok(Priced {
            event,
            total,
            user_name,
        })
    }

    async fn place(
        &self,
        user: &AuthUser,
        order: ValidOrder,
        priced: Priced,
        key: &AttemptKey,
    ) -> Result<OrderCreated, BookingError> {
        let now = self.collaborators.clock.now();
        let receipt = format!(
            "CTH_{}_{}_{}",
            priced.event.id.short(),
            user.id.short(),
            now.timestamp_millis()
        );

        let request = OrderRequest {
            amount: priced.total,
            currency: self.currency.clone(),
            receipt: receipt.clone(),
            notes: BTreeMap::from([
                ("company".to_string(), "Club Too High".to_string()),
                ("purpose".to_string(), "Event Ticket Booking".to_string()),
                ("bookingEventId".to_string(), priced.event.id.to_string()),
            ]),
        };

        let started = Instant::now();
        let result = self.collaborators.gateway.create_order(request).await;
        PaymentMetrics::record_gateway_call(started.elapsed());
        let gateway_order = match result {
            Ok(gateway_order) => gateway_order,
            Err(e) => {
                self.guards
                    .attempts
                    .update_status(key, AttemptStatus::Failed, None);
                error!(error = %e, receipt = %receipt, "Gateway order creation failed");
                return Err(e.into());
            }
        };

        self.guards.attempts.mark_processing(key, &gateway_order.id);

        let booking = NewBooking {
            id: BookingId::new(),
            event_id: order.event_id,
            user_id: user.id,
            tickets: order.tickets,
            total_amount: priced.total,
            razorpay_order_id: gateway_order.id.clone(),
            receipt_id: receipt.clone(),
            created_at: now,
        };
        let booking = match self.collaborators.bookings.insert(booking).await {
            Ok(booking) => booking,
            Err(e) => {
                self.guards
                    .attempts
                    .update_status(key, AttemptStatus::Failed, None);
                PaymentMetrics::record_orphaned_order();
                error!(
                    order_id = %gateway_order.id,
                    receipt = %receipt,
                    error = %e,
                    "Booking insert failed after gateway order was created; order is orphaned"
                );
                return Err(e.into());
            }
        };
        // Only a payable order is worth pointing a retry at.
        self.guards.orders.register_order(key.clone(), &gateway_order.id);

        Ok(OrderCreated {
            order_id: gateway_order.id,
            amount: gateway_order.amount,
            currency: gateway_order.currency,
            receipt,
            booking_id: booking.id,
            event_title: priced.event.title,
            user_name: priced.user_name,
        })
    }
}

/// Validated tier count to an integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole(count: Option<f64>) -> u32 {
    // In [0, max_ticket_quantity] and integral after validation.
    count.unwrap_or(0.0) as u32
}

const fn rejection_reason(error: &BookingError) -> &'static str {
    match error {
        BookingError::Validation(_) => "validation",
        BookingError::Unauthorized(_) | BookingError::Auth(_) => "unauthorized",
        BookingError::Forbidden(_) => "forbidden",
        BookingError::RateLimited { .. } => "rate_limited",
        BookingError::SecurityViolation(_) => "security",
        BookingError::Duplicate { .. } => "duplicate",
        BookingError::NotFound { .. } => "not_found",
        BookingError::AmountMismatch { .. } => "amount_mismatch",
        BookingError::Gateway(_) => "gateway",
        BookingError::Persistence(_) => "persistence",
        BookingError::InvalidTransition { .. } | BookingError::Signature => "other",
    }
}
