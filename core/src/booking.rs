//! Booking status transitions.
//!
//! Both the checkout verifier and the webhook reconciler describe what they
//! learned as a [`BookingUpdate`]; [`plan`] decides what, if anything, gets
//! written. The store then applies the resulting [`BookingPatch`] as a
//! compare-and-set on the status the plan was computed from.
//!
//! ```text
//!             ┌──────────► confirmed (terminal, payment id may be attached once)
//!   pending ──┤
//!             └──────────► failed    (terminal)
//!
//!   cancelled (terminal, set out of band)
//! ```

use crate::types::{Booking, BookingStatus, Money};
use chrono::{DateTime, Utc};

/// What a confirmation path learned about a payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingUpdate {
    /// Payment succeeded.
    Confirm {
        /// Gateway payment id, if the source carries one
        payment_id: Option<String>,
        /// Verified checkout signature (checkout path only)
        signature: Option<String>,
        /// Amount the gateway reports as paid (`order.paid`)
        amount_paid: Option<Money>,
        /// Delivered by a webhook
        via_webhook: bool,
    },
    /// Payment failed.
    Fail {
        /// Failure reason to store
        reason: String,
        /// Gateway payment id, if known
        payment_id: Option<String>,
        /// Delivered by a webhook
        via_webhook: bool,
    },
}

/// Column changes for one conditional update.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingPatch {
    /// Status to write
    pub status: BookingStatus,
    /// Gateway payment id
    pub razorpay_payment_id: Option<String>,
    /// Checkout signature
    pub razorpay_signature: Option<String>,
    /// Failure reason
    pub failure_reason: Option<String>,
    /// Confirmation time
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Set the webhook flag
    pub webhook_confirmed: Option<bool>,
    /// Paid amount
    pub amount_paid: Option<Money>,
}

impl BookingPatch {
    /// Apply the patch to an in-memory copy of a booking.
    pub fn apply_to(&self, booking: &mut Booking, at: DateTime<Utc>) {
        booking.status = self.status;
        if let Some(payment_id) = &self.razorpay_payment_id {
            booking.razorpay_payment_id = Some(payment_id.clone());
        }
        if let Some(signature) = &self.razorpay_signature {
            booking.razorpay_signature = Some(signature.clone());
        }
        if let Some(reason) = &self.failure_reason {
            booking.failure_reason = Some(reason.clone());
        }
        if let Some(confirmed_at) = self.confirmed_at {
            booking.confirmed_at = Some(confirmed_at);
        }
        if let Some(flag) = self.webhook_confirmed {
            booking.webhook_confirmed = flag;
        }
        if let Some(amount) = self.amount_paid {
            booking.amount_paid = Some(amount);
        }
        booking.updated_at = at;
    }
}

/// Result of planning an update against the current row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Write this patch, conditional on the status being `expected`.
    Apply {
        /// Status the plan was computed against
        expected: BookingStatus,
        /// Changes to write
        patch: BookingPatch,
    },
    /// Nothing to write; the booking already reflects the update.
    Unchanged,
    /// The update contradicts a terminal status.
    Rejected {
        /// Status found
        current: BookingStatus,
    },
}

/// Decide how `update` applies to `booking` at time `now`.
#[must_use]
pub fn plan(booking: &Booking, update: &BookingUpdate, now: DateTime<Utc>) -> Transition {
    match (booking.status, update) {
        (
            BookingStatus::Pending,
            BookingUpdate::Confirm {
                payment_id,
                signature,
                amount_paid,
                via_webhook,
            },
        ) => Transition::Apply {
            expected: BookingStatus::Pending,
            patch: BookingPatch {
                status: BookingStatus::Confirmed,
                razorpay_payment_id: payment_id.clone(),
                razorpay_signature: signature.clone(),
                failure_reason: None,
                confirmed_at: Some(now),
                webhook_confirmed: via_webhook.then_some(true),
                amount_paid: *amount_paid,
            },
        },
        (
            BookingStatus::Pending,
            BookingUpdate::Fail {
                reason,
                payment_id,
                via_webhook,
            },
        ) => Transition::Apply {
            expected: BookingStatus::Pending,
            patch: BookingPatch {
                status: BookingStatus::Failed,
                razorpay_payment_id: payment_id.clone(),
                razorpay_signature: None,
                failure_reason: Some(reason.clone()),
                confirmed_at: None,
                webhook_confirmed: via_webhook.then_some(true),
                amount_paid: None,
            },
        },
        (
            BookingStatus::Confirmed,
            BookingUpdate::Confirm {
                payment_id,
                signature,
                amount_paid,
                via_webhook,
            },
        ) => attach_missing(
            booking,
            payment_id.as_deref(),
            signature.as_deref(),
            *amount_paid,
            *via_webhook,
        ),
        (BookingStatus::Failed, BookingUpdate::Fail { .. }) => Transition::Unchanged,
        (current, _) => Transition::Rejected { current },
    }
}

/// A second confirmation may only fill details the first one lacked.
fn attach_missing(
    booking: &Booking,
    payment_id: Option<&str>,
    signature: Option<&str>,
    amount_paid: Option<Money>,
    via_webhook: bool,
) -> Transition {
    let attach_payment = booking.razorpay_payment_id.is_none() && payment_id.is_some();
    let attach_amount = booking.amount_paid.is_none() && amount_paid.is_some();

    if !attach_payment && !attach_amount {
        return Transition::Unchanged;
    }

    Transition::Apply {
        expected: BookingStatus::Confirmed,
        patch: BookingPatch {
            status: BookingStatus::Confirmed,
            razorpay_payment_id: payment_id
                .filter(|_| attach_payment)
                .map(str::to_string),
            razorpay_signature: signature
                .filter(|_| attach_payment && booking.razorpay_signature.is_none())
                .map(str::to_string),
            failure_reason: None,
            confirmed_at: None,
            webhook_confirmed: via_webhook.then_some(true),
            amount_paid: amount_paid.filter(|_| attach_amount),
        },
    }
}
