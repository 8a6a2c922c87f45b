//! Webhook event parsing.
//!
//! Razorpay posts an envelope `{"event": "...", "payload": {...}}`. Only the
//! events that settle a booking are modelled; anything else parses as
//! [`WebhookEvent::Unrecognized`] so it can be logged and acknowledged.

use crate::error::RazorpayError;
use clubpass_core::types::Money;
use serde::Deserialize;

/// Payment fields carried by `payment.*` events.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentEntity {
    /// Payment id (`pay_…`)
    pub id: String,
    /// Order the payment belongs to
    pub order_id: String,
    /// Amount in minor units
    pub amount: Money,
    /// Gateway status (`authorized`, `captured`, `failed`)
    #[serde(default)]
    pub status: Option<String>,
    /// Error code on failure
    #[serde(default)]
    pub error_code: Option<String>,
    /// Error description on failure
    #[serde(default)]
    pub error_description: Option<String>,
}

impl PaymentEntity {
    /// `<code>: <description>` as stored on a failed booking.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        format!(
            "{}: {}",
            self.error_code.as_deref().unwrap_or("UNKNOWN_ERROR"),
            self.error_description.as_deref().unwrap_or("Payment failed")
        )
    }
}

/// Order fields carried by `order.paid`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OrderEntity {
    /// Order id (`order_…`)
    pub id: String,
    /// Amount paid in minor units
    pub amount_paid: Money,
}

/// A webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// `payment.authorized`
    PaymentAuthorized(PaymentEntity),
    /// `payment.captured`
    PaymentCaptured(PaymentEntity),
    /// `payment.failed`
    PaymentFailed(PaymentEntity),
    /// `order.paid`
    OrderPaid(OrderEntity),
    /// Any other event type
    Unrecognized {
        /// Event name as sent
        event: String,
    },
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    entity: T,
}

#[derive(Deserialize)]
struct PaymentPayload {
    payment: Wrapped<PaymentEntity>,
}

#[derive(Deserialize)]
struct OrderPayload {
    order: Wrapped<OrderEntity>,
}

impl WebhookEvent {
    /// Parse a raw webhook body.
    ///
    /// # Errors
    ///
    /// Returns [`RazorpayError::MalformedWebhook`] if the body is not an
    /// event envelope, or if a known event lacks the fields it needs.
    pub fn parse(body: &[u8]) -> Result<Self, RazorpayError> {
        let envelope: Envelope = serde_json::from_slice(body)
            .map_err(|e| RazorpayError::MalformedWebhook(format!("invalid envelope: {e}")))?;

        let payment = |payload: serde_json::Value| {
            serde_json::from_value::<PaymentPayload>(payload)
                .map(|p| p.payment.entity)
                .map_err(|e| {
                    RazorpayError::MalformedWebhook(format!("{}: {e}", envelope.event))
                })
        };

        match envelope.event.as_str() {
            "payment.authorized" => payment(envelope.payload).map(Self::PaymentAuthorized),
            "payment.captured" => payment(envelope.payload).map(Self::PaymentCaptured),
            "payment.failed" => payment(envelope.payload).map(Self::PaymentFailed),
            "order.paid" => serde_json::from_value::<OrderPayload>(envelope.payload)
                .map(|p| Self::OrderPaid(p.order.entity))
                .map_err(|e| RazorpayError::MalformedWebhook(format!("order.paid: {e}"))),
            _ => Ok(Self::Unrecognized {
                event: envelope.event.clone(),
            }),
        }
    }

    /// Metric label for the event.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PaymentAuthorized(_) => "payment.authorized",
            Self::PaymentCaptured(_) => "payment.captured",
            Self::PaymentFailed(_) => "payment.failed",
            Self::OrderPaid(_) => "order.paid",
            Self::Unrecognized { .. } => "unrecognized",
        }
    }

    /// Gateway order the event refers to, if any.
    #[must_use]
    pub fn order_id(&self) -> Option<&str> {
        match self {
            Self::PaymentAuthorized(p) | Self::PaymentCaptured(p) | Self::PaymentFailed(p) => {
                Some(&p.order_id)
            }
            Self::OrderPaid(o) => Some(&o.id),
            Self::Unrecognized { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn payment_body(event: &str) -> String {
        format!(
            r#"{{
                "entity": "event",
                "event": "{event}",
                "payload": {{
                    "payment": {{
                        "entity": {{
                            "id": "pay_1",
                            "order_id": "order_1",
                            "amount": 190000,
                            "status": "captured",
                            "error_code": "BAD_REQUEST_ERROR",
                            "error_description": "Card declined"
                        }}
                    }}
                }}
            }}"#
        )
    }

    #[test]
    fn test_parse_captured() {
        let event = WebhookEvent::parse(payment_body("payment.captured").as_bytes()).unwrap();
        match event {
            WebhookEvent::PaymentCaptured(p) => {
                assert_eq!(p.id, "pay_1");
                assert_eq!(p.order_id, "order_1");
                assert_eq!(p.amount, Money::from_paise(190_000));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_failure_reason() {
        let event = WebhookEvent::parse(payment_body("payment.failed").as_bytes()).unwrap();
        match event {
            WebhookEvent::PaymentFailed(p) => {
                assert_eq!(p.failure_reason(), "BAD_REQUEST_ERROR: Card declined");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_order_paid() {
        let body = br#"{"event":"order.paid","payload":{"order":{"entity":{"id":"order_1","amount_paid":190000}}}}"#;
        let event = WebhookEvent::parse(body).unwrap();
        assert_eq!(event.order_id(), Some("order_1"));
        assert_eq!(event.kind(), "order.paid");
    }

    #[test]
    fn test_unknown_event_is_unrecognized() {
        let body = br#"{"event":"refund.created","payload":{}}"#;
        assert_eq!(
            WebhookEvent::parse(body).unwrap(),
            WebhookEvent::Unrecognized {
                event: "refund.created".to_string()
            }
        );
    }

    #[test]
    fn test_known_event_without_entity_is_malformed() {
        let body = br#"{"event":"payment.captured","payload":{}}"#;
        assert!(matches!(
            WebhookEvent::parse(body),
            Err(RazorpayError::MalformedWebhook(_))
        ));
        assert!(WebhookEvent::parse(b"not json").is_err());
    }
}
