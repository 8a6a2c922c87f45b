//! Checkout confirmation.
//!
//! The checkout widget hands the client `(order_id, payment_id, signature)`
//! where the signature is HMAC-SHA256 over `order_id|payment_id` with the
//! key secret. A valid signature confirms the booking; an invalid one fails
//! it while it is still pending.

use super::transitions::settle;
use super::{Collaborators, Guards, RequestContext};
use clubpass_core::booking::BookingUpdate;
use clubpass_core::error::BookingError;
use clubpass_core::types::{Booking, BookingDetails, BookingId, BookingStatus};
use clubpass_core::validation::{ValidationLimits, ValidationResult, validate_uuid};
use clubpass_razorpay::verify_payment_signature;
use clubpass_runtime::ledger::{AttemptKey, AttemptStatus};
use clubpass_runtime::metrics::PaymentMetrics;
use clubpass_runtime::rate_limit::EndpointClass;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Failure reason stored when the checkout signature does not verify.
pub const INVALID_SIGNATURE_REASON: &str = "Invalid payment signature";

/// `POST /api/payment/verify` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyPaymentRequest {
    /// Gateway payment id
    pub razorpay_payment_id: Option<String>,
    /// Gateway order id
    pub razorpay_order_id: Option<String>,
    /// Checkout signature
    pub razorpay_signature: Option<String>,
    /// Booking created with the order
    #[serde(rename = "bookingId")]
    pub booking_id: Option<String>,
}

/// Confirmed booking with its event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedPayment {
    /// Always `true`
    pub success: bool,
    /// The confirmed booking
    pub booking_id: BookingId,
    /// Message for the receipt page
    pub message: String,
    /// Booking joined with its event summary
    pub booking: BookingDetails,
}

struct ValidConfirmation {
    payment_id: String,
    order_id: String,
    signature: String,
    booking_id: BookingId,
}

/// Confirms bookings from signed checkout callbacks.
#[derive(Clone)]
pub struct ConfirmationVerifier {
    collaborators: Collaborators,
    guards: Guards,
    limits: ValidationLimits,
    key_secret: String,
}

impl ConfirmationVerifier {
    /// Create a verifier checking signatures with `key_secret`.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        guards: Guards,
        limits: ValidationLimits,
        key_secret: impl Into<String>,
    ) -> Self {
        Self {
            collaborators,
            guards,
            limits,
            key_secret: key_secret.into(),
        }
    }

    /// Verify a checkout confirmation and confirm its booking.
    ///
    /// Re-verifying an already confirmed booking succeeds without changing
    /// it.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for missing fields
    /// - [`BookingError::RateLimited`] past the `payment-verify` quota
    /// - [`BookingError::Signature`] if the signature does not verify
    /// - [`BookingError::NotFound`] if no booking carries this id and order
    /// - [`BookingError::InvalidTransition`] for failed or cancelled bookings
    #[instrument(skip_all, fields(client = %ctx.client_id))]
    pub async fn verify(
        &self,
        request: VerifyPaymentRequest,
        ctx: &RequestContext,
    ) -> Result<VerifiedPayment, BookingError> {
        let result = self.try_verify(request, ctx).await;
        let outcome = match &result {
            Ok(_) => "confirmed",
            Err(BookingError::Signature) => "invalid_signature",
            Err(BookingError::InvalidTransition { .. }) => "conflict",
            Err(BookingError::Validation(_) | BookingError::RateLimited { .. }) => "rejected",
            Err(_) => "error",
        };
        PaymentMetrics::record_verification(outcome);
        result
    }

    async fn try_verify(
        &self,
        request: VerifyPaymentRequest,
        ctx: &RequestContext,
    ) -> Result<VerifiedPayment, BookingError> {
        let confirmation = self.validate(request)?;

        self.guards
            .rate
            .check(EndpointClass::PaymentVerify, &ctx.client_id)
            .into_result()?;

        if !verify_payment_signature(
            &self.key_secret,
            &confirmation.order_id,
            &confirmation.payment_id,
            &confirmation.signature,
        ) {
            warn!(
                booking_id = %confirmation.booking_id,
                order_id = %confirmation.order_id,
                "Payment signature verification failed"
            );
            self.fail_unverified(&confirmation).await;
            return Err(BookingError::Signature);
        }

        let details = self
            .collaborators
            .bookings
            .find_by_id_and_order(confirmation.booking_id, &confirmation.order_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", confirmation.booking_id))?;

        let update = BookingUpdate::Confirm {
            payment_id: Some(confirmation.payment_id.clone()),
            signature: Some(confirmation.signature),
            amount_paid: None,
            via_webhook: false,
        };
        let settled = settle(
            self.collaborators.bookings.as_ref(),
            details.booking,
            &update,
            self.collaborators.clock.as_ref(),
        )
        .await?;

        let applied = settled.is_applied();
        let booking = settled.into_booking();
        self.guards.attempts.update_status(
            &attempt_key(&booking),
            AttemptStatus::Completed,
            Some(confirmation.payment_id),
        );
        info!(
            booking_id = %booking.id,
            payment_id = ?booking.razorpay_payment_id,
            applied,
            "Payment verified"
        );

        Ok(VerifiedPayment {
            success: true,
            booking_id: booking.id,
            message: "Payment verified and booking confirmed".to_string(),
            booking: BookingDetails {
                booking,
                event: details.event,
            },
        })
    }

    fn validate(&self, request: VerifyPaymentRequest) -> Result<ValidConfirmation, BookingError> {
        let payment_id = request.razorpay_payment_id.unwrap_or_default();
        let order_id = request.razorpay_order_id.unwrap_or_default();
        let signature = request.razorpay_signature.unwrap_or_default();
        let booking_id = request.booking_id.unwrap_or_default();

        ValidationResult::combine([
            self.limits.identifier(&payment_id, "razorpay_payment_id"),
            self.limits.identifier(&order_id, "razorpay_order_id"),
            self.limits.identifier(&signature, "razorpay_signature"),
            validate_uuid(&booking_id, "bookingId"),
        ])
        .into_result()?;

        Ok(ValidConfirmation {
            payment_id: payment_id.trim().to_string(),
            order_id: order_id.trim().to_string(),
            signature: signature.trim().to_string(),
            booking_id: booking_id
                .parse()
                .map_err(|_| BookingError::invalid("bookingId", "Invalid ID format"))?,
        })
    }

    /// Fail the booking if it is still pending. Errors are logged only; the
    /// caller answers with the signature error regardless.
    async fn fail_unverified(&self, confirmation: &ValidConfirmation) {
        let lookup = self
            .collaborators
            .bookings
            .find_by_id_and_order(confirmation.booking_id, &confirmation.order_id)
            .await;
        let booking = match lookup {
            Ok(Some(details)) => details.booking,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Could not load booking after signature failure");
                return;
            }
        };

        self.guards
            .attempts
            .update_status(&attempt_key(&booking), AttemptStatus::Failed, None);

        if booking.status != BookingStatus::Pending {
            return;
        }
        let update = BookingUpdate::Fail {
            reason: INVALID_SIGNATURE_REASON.to_string(),
            payment_id: None,
            via_webhook: false,
        };
        if let Err(e) = settle(
            self.collaborators.bookings.as_ref(),
            booking,
            &update,
            self.collaborators.clock.as_ref(),
        )
        .await
        {
            warn!(error = %e, "Could not mark booking failed after signature failure");
        }
    }
}

pub(crate) fn attempt_key(booking: &Booking) -> AttemptKey {
    AttemptKey::new(booking.user_id, booking.event_id, booking.total_amount)
}
