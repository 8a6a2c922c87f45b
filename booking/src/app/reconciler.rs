//! Webhook reconciliation.
//!
//! The gateway pushes payment events signed with the webhook secret over the
//! raw body. Deliveries are at-least-once and may race the checkout
//! verifier, so every write goes through [`settle`] and a repeated delivery
//! lands as a no-op.
//!
//! Only a bad signature is an error. Everything after that (unknown
//! events, unknown orders, store failures) is logged and acknowledged so
//! the gateway stops retrying.

use super::transitions::settle;
use super::verifier::attempt_key;
use super::{Collaborators, Guards};
use clubpass_core::booking::BookingUpdate;
use clubpass_core::error::BookingError;
use clubpass_core::types::{BookingId, BookingStatus};
use clubpass_razorpay::{WebhookEvent, verify_webhook_signature};
use clubpass_runtime::ledger::AttemptStatus;
use clubpass_runtime::metrics::PaymentMetrics;
use tracing::{debug, error, info, instrument, warn};

/// What a delivery did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The booking moved to `status`, or had details attached.
    Applied {
        /// Booking written
        booking_id: BookingId,
        /// Status after the write
        status: BookingStatus,
    },
    /// The booking already reflected the event.
    Unchanged {
        /// Booking found
        booking_id: BookingId,
    },
    /// The event contradicts the booking's terminal status.
    Rejected {
        /// Booking found
        booking_id: BookingId,
        /// Its status
        current: BookingStatus,
    },
    /// Money was taken for a booking already marked `failed`; needs a refund
    /// or a manual confirmation.
    PaidAfterFailure {
        /// Booking found
        booking_id: BookingId,
        /// Gateway payment id, when the event carries one
        payment_id: Option<String>,
    },
    /// No booking carries the order id.
    UnknownOrder {
        /// Order id from the payload
        order_id: String,
    },
    /// Event type not handled, or payload unreadable.
    Ignored {
        /// Event name, or `malformed`
        event: String,
    },
    /// The store failed; the delivery is acknowledged anyway.
    Failed {
        /// Error description
        reason: String,
    },
}

/// Applies signed webhook deliveries to bookings.
#[derive(Clone)]
pub struct WebhookReconciler {
    collaborators: Collaborators,
    guards: Guards,
    webhook_secret: String,
}

impl WebhookReconciler {
    /// Create a reconciler checking signatures with `webhook_secret`.
    #[must_use]
    pub fn new(collaborators: Collaborators, guards: Guards, webhook_secret: impl Into<String>) -> Self {
        Self {
            collaborators,
            guards,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify and apply one delivery.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Signature`] if `signature` is not the HMAC of
    /// `body`; nothing is read or written in that case.
    #[instrument(skip_all)]
    pub async fn handle(&self, body: &[u8], signature: &str) -> Result<WebhookOutcome, BookingError> {
        if !verify_webhook_signature(&self.webhook_secret, body, signature) {
            PaymentMetrics::record_webhook("invalid_signature");
            warn!("Webhook signature verification failed");
            return Err(BookingError::Signature);
        }

        let event = match WebhookEvent::parse(body) {
            Ok(event) => event,
            Err(e) => {
                PaymentMetrics::record_webhook("malformed");
                warn!(error = %e, "Unreadable webhook payload acknowledged");
                return Ok(WebhookOutcome::Ignored {
                    event: "malformed".to_string(),
                });
            }
        };
        PaymentMetrics::record_webhook(event.kind());

        let (order_id, update) = match event {
            WebhookEvent::PaymentAuthorized(payment) | WebhookEvent::PaymentCaptured(payment) => (
                payment.order_id,
                BookingUpdate::Confirm {
                    payment_id: Some(payment.id),
                    signature: None,
                    amount_paid: None,
                    via_webhook: true,
                },
            ),
            WebhookEvent::OrderPaid(order) => (
                order.id,
                BookingUpdate::Confirm {
                    payment_id: None,
                    signature: None,
                    amount_paid: Some(order.amount_paid),
                    via_webhook: true,
                },
            ),
            WebhookEvent::PaymentFailed(payment) => {
                let reason = payment.failure_reason();
                (
                    payment.order_id,
                    BookingUpdate::Fail {
                        reason,
                        payment_id: Some(payment.id),
                        via_webhook: true,
                    },
                )
            }
            WebhookEvent::Unrecognized { event } => {
                info!(event = %event, "Unhandled webhook event acknowledged");
                return Ok(WebhookOutcome::Ignored { event });
            }
        };

        match self.apply(&order_id, &update).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(order_id = %order_id, error = %e, "Webhook reconciliation failed");
                Ok(WebhookOutcome::Failed {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn apply(&self, order_id: &str, update: &BookingUpdate) -> Result<WebhookOutcome, BookingError> {
        let Some(booking) = self.collaborators.bookings.find_by_order_id(order_id).await? else {
            warn!(order_id = %order_id, "Webhook for unknown order");
            return Ok(WebhookOutcome::UnknownOrder {
                order_id: order_id.to_string(),
            });
        };
        let booking_id = booking.id;
        let key = attempt_key(&booking);

        let settled = settle(
            self.collaborators.bookings.as_ref(),
            booking,
            update,
            self.collaborators.clock.as_ref(),
        )
        .await;

        match (settled, update) {
            (Ok(settled), _) if settled.is_applied() => {
                let booking = settled.into_booking();
                match update {
                    BookingUpdate::Confirm { .. } => self.guards.attempts.update_status(
                        &key,
                        AttemptStatus::Completed,
                        booking.razorpay_payment_id.clone(),
                    ),
                    BookingUpdate::Fail { .. } => {
                        self.guards
                            .attempts
                            .update_status(&key, AttemptStatus::Failed, None);
                    }
                }
                info!(booking_id = %booking_id, status = %booking.status, "Booking updated from webhook");
                Ok(WebhookOutcome::Applied {
                    booking_id,
                    status: booking.status,
                })
            }
            (Ok(_), _) => {
                debug!(booking_id = %booking_id, "Webhook already reflected in booking");
                Ok(WebhookOutcome::Unchanged { booking_id })
            }
            (
                Err(BookingError::InvalidTransition {
                    current: BookingStatus::Failed,
                }),
                BookingUpdate::Confirm { payment_id, .. },
            ) => {
                let payment_id = payment_id.clone();
                PaymentMetrics::record_unreconciled_payment();
                error!(
                    booking_id = %booking_id,
                    order_id = %order_id,
                    payment_id = ?payment_id,
                    "Payment succeeded for a failed booking; reconcile manually"
                );
                Ok(WebhookOutcome::PaidAfterFailure {
                    booking_id,
                    payment_id,
                })
            }
            (Err(BookingError::InvalidTransition { current }), _) => {
                warn!(
                    booking_id = %booking_id,
                    current = %current,
                    "Webhook contradicts settled booking, ignoring"
                );
                Ok(WebhookOutcome::Rejected { booking_id, current })
            }
            (Err(e), _) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::app::test_support::{Harness, KEY_SECRET, WEBHOOK_SECRET};
    use crate::app::VerifyPaymentRequest;
    use clubpass_core::types::Money;
    use clubpass_razorpay::signature::{sign_payment, sign_webhook};

    async fn created(h: &Harness) -> (BookingId, String) {
        let created = h
            .orchestrator()
            .create_order(&h.user(), h.order_request(2, 1, 0, 1900.0), &Harness::ctx())
            .await
            .unwrap();
        (created.booking_id, created.order_id)
    }

    fn payment_event(event: &str, order_id: &str, payment_id: &str) -> Vec<u8> {
        serde_json::json!({
            "entity": "event",
            "event": event,
            "payload": {
                "payment": {
                    "entity": {
                        "id": payment_id,
                        "order_id": order_id,
                        "amount": 190_000,
                        "status": "captured",
                        "error_code": "BAD_REQUEST_ERROR",
                        "error_description": "Card declined"
                    }
                }
            }
        })
        .to_string()
        .into_bytes()
    }

    fn order_paid(order_id: &str) -> Vec<u8> {
        serde_json::json!({
            "entity": "event",
            "event": "order.paid",
            "payload": {
                "order": { "entity": { "id": order_id, "amount_paid": 190_000 } }
            }
        })
        .to_string()
        .into_bytes()
    }

    async fn deliver(h: &Harness, body: &[u8]) -> WebhookOutcome {
        h.reconciler()
            .handle(body, &sign_webhook(WEBHOOK_SECRET, body))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_captured_confirms_once() {
        let h = Harness::new();
        let (booking_id, order_id) = created(&h).await;
        let body = payment_event("payment.captured", &order_id, "pay_9");

        assert_eq!(
            deliver(&h, &body).await,
            WebhookOutcome::Applied {
                booking_id,
                status: BookingStatus::Confirmed
            }
        );
        let first = h.bookings.row(booking_id).unwrap();
        assert!(first.webhook_confirmed);
        assert_eq!(first.razorpay_payment_id.as_deref(), Some("pay_9"));

        h.clock.advance(chrono::Duration::seconds(30));
        assert_eq!(deliver(&h, &body).await, WebhookOutcome::Unchanged { booking_id });
        assert_eq!(h.bookings.row(booking_id).unwrap(), first);
    }

    #[tokio::test]
    async fn test_wrong_secret_mutates_nothing() {
        let h = Harness::new();
        let (booking_id, order_id) = created(&h).await;
        let before = h.bookings.row(booking_id).unwrap();
        let body = payment_event("payment.captured", &order_id, "pay_9");

        let err = h
            .reconciler()
            .handle(&body, &sign_webhook("some_other_secret", &body))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Signature));
        assert_eq!(h.bookings.row(booking_id).unwrap(), before);
    }

    #[tokio::test]
    async fn test_payment_failed_records_reason() {
        let h = Harness::new();
        let (booking_id, order_id) = created(&h).await;

        let outcome = deliver(&h, &payment_event("payment.failed", &order_id, "pay_9")).await;

        assert_eq!(
            outcome,
            WebhookOutcome::Applied {
                booking_id,
                status: BookingStatus::Failed
            }
        );
        let stored = h.bookings.row(booking_id).unwrap();
        assert_eq!(
            stored.failure_reason.as_deref(),
            Some("BAD_REQUEST_ERROR: Card declined")
        );
        assert!(stored.webhook_confirmed);
    }

    #[tokio::test]
    async fn test_webhook_after_checkout_is_noop() {
        let h = Harness::new();
        let (booking_id, order_id) = created(&h).await;
        let signature = sign_payment(KEY_SECRET, &order_id, "pay_1");
        h.verifier()
            .verify(
                VerifyPaymentRequest {
                    razorpay_payment_id: Some("pay_1".to_string()),
                    razorpay_order_id: Some(order_id.clone()),
                    razorpay_signature: Some(signature),
                    booking_id: Some(booking_id.to_string()),
                },
                &Harness::ctx(),
            )
            .await
            .unwrap();
        let confirmed = h.bookings.row(booking_id).unwrap();

        let outcome = deliver(&h, &payment_event("payment.captured", &order_id, "pay_1")).await;

        assert_eq!(outcome, WebhookOutcome::Unchanged { booking_id });
        assert_eq!(h.bookings.row(booking_id).unwrap(), confirmed);
    }

    #[tokio::test]
    async fn test_failure_after_confirmation_is_rejected() {
        let h = Harness::new();
        let (booking_id, order_id) = created(&h).await;
        deliver(&h, &payment_event("payment.captured", &order_id, "pay_1")).await;

        let outcome = deliver(&h, &payment_event("payment.failed", &order_id, "pay_2")).await;

        assert_eq!(
            outcome,
            WebhookOutcome::Rejected {
                booking_id,
                current: BookingStatus::Confirmed
            }
        );
    }

    #[tokio::test]
    async fn test_capture_after_failure_is_flagged() {
        let h = Harness::new();
        let (booking_id, order_id) = created(&h).await;
        deliver(&h, &payment_event("payment.failed", &order_id, "pay_1")).await;
        let failed = h.bookings.row(booking_id).unwrap();

        let outcome = deliver(&h, &payment_event("payment.captured", &order_id, "pay_2")).await;

        assert_eq!(
            outcome,
            WebhookOutcome::PaidAfterFailure {
                booking_id,
                payment_id: Some("pay_2".to_string())
            }
        );
        assert_eq!(h.bookings.row(booking_id).unwrap(), failed);
    }

    #[tokio::test]
    async fn test_order_paid_sets_amount() {
        let h = Harness::new();
        let (booking_id, order_id) = created(&h).await;

        deliver(&h, &order_paid(&order_id)).await;

        let stored = h.bookings.row(booking_id).unwrap();
        assert_eq!(stored.status, BookingStatus::Confirmed);
        assert_eq!(stored.amount_paid, Some(Money::from_paise(190_000)));
        assert_eq!(stored.razorpay_payment_id, None);

        // The later payment event fills in the payment id.
        deliver(&h, &payment_event("payment.captured", &order_id, "pay_3")).await;
        assert_eq!(
            h.bookings.row(booking_id).unwrap().razorpay_payment_id.as_deref(),
            Some("pay_3")
        );
    }

    #[tokio::test]
    async fn test_unknown_order_and_event_are_acknowledged() {
        let h = Harness::new();

        assert_eq!(
            deliver(&h, &payment_event("payment.captured", "order_missing", "pay_1")).await,
            WebhookOutcome::UnknownOrder {
                order_id: "order_missing".to_string()
            }
        );

        let refund = br#"{"event":"refund.created","payload":{}}"#;
        assert_eq!(
            deliver(&h, refund).await,
            WebhookOutcome::Ignored {
                event: "refund.created".to_string()
            }
        );

        assert_eq!(
            deliver(&h, b"not json").await,
            WebhookOutcome::Ignored {
                event: "malformed".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_acknowledged() {
        let h = Harness::new();
        let (_, order_id) = created(&h).await;
        h.bookings.fail_writes(true);

        let outcome = deliver(&h, &payment_event("payment.captured", &order_id, "pay_1")).await;
        assert!(matches!(outcome, WebhookOutcome::Failed { .. }));
    }
}
