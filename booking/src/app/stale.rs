//! Expiry of bookings whose payment never arrived.

use super::transitions::settle;
use async_trait::async_trait;
use clubpass_core::booking::BookingUpdate;
use clubpass_core::environment::Clock;
use clubpass_core::error::BookingError;
use clubpass_core::repository::BookingRepository;
use clubpass_runtime::Sweep;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Failure reason stored on expired bookings.
pub const STALE_BOOKING_REASON: &str = "Payment not completed in time";

/// Fails `pending` bookings older than `max_age`.
pub struct StaleBookingSweep {
    bookings: Arc<dyn BookingRepository>,
    clock: Arc<dyn Clock>,
    max_age: chrono::Duration,
}

impl StaleBookingSweep {
    /// Create a sweep over `bookings`.
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        clock: Arc<dyn Clock>,
        max_age: chrono::Duration,
    ) -> Self {
        Self {
            bookings,
            clock,
            max_age,
        }
    }

    /// Run one pass; returns the number of bookings failed.
    pub async fn expire(&self) -> usize {
        let cutoff = self.clock.now() - self.max_age;
        let stale = match self.bookings.list_stale_pending(cutoff).await {
            Ok(stale) => stale,
            Err(e) => {
                warn!(error = %e, "Could not list stale bookings");
                return 0;
            }
        };

        let update = BookingUpdate::Fail {
            reason: STALE_BOOKING_REASON.to_string(),
            payment_id: None,
            via_webhook: false,
        };

        let mut expired = 0;
        for booking in stale {
            let id = booking.id;
            match settle(self.bookings.as_ref(), booking, &update, self.clock.as_ref()).await {
                Ok(settled) if settled.is_applied() => {
                    info!(booking_id = %id, "Expired unpaid booking");
                    expired += 1;
                }
                Ok(_) => {}
                // Confirmed between listing and writing.
                Err(BookingError::InvalidTransition { current }) => {
                    debug!(booking_id = %id, current = %current, "Booking settled before expiry");
                }
                Err(e) => warn!(booking_id = %id, error = %e, "Could not expire booking"),
            }
        }
        expired
    }
}

#[async_trait]
impl Sweep for StaleBookingSweep {
    fn name(&self) -> &'static str {
        "stale_bookings"
    }

    async fn sweep(&self) -> usize {
        self.expire().await
    }
}
