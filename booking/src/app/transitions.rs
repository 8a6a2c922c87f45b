//! Applying a [`BookingUpdate`] against the store.

use clubpass_core::booking::{BookingUpdate, Transition, plan};
use clubpass_core::environment::Clock;
use clubpass_core::error::{BookingError, RepositoryError};
use clubpass_core::repository::BookingRepository;
use clubpass_core::types::Booking;
use tracing::debug;

/// Compare-and-set rounds before giving up.
const MAX_ROUNDS: usize = 3;

/// What [`settle`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled {
    /// The update was written; carries the new row.
    Applied(Booking),
    /// The row already reflected the update.
    Unchanged(Booking),
}

impl Settled {
    /// The booking as it is now stored.
    #[must_use]
    pub fn into_booking(self) -> Booking {
        match self {
            Self::Applied(booking) | Self::Unchanged(booking) => booking,
        }
    }

    /// Whether anything was written.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Plan `update` against `booking` and write it with a compare-and-set.
///
/// When another writer changed the status first, the row is reloaded and
/// the update re-planned against it, so a concurrent confirmation turns
/// into `Unchanged` rather than an overwrite.
///
/// # Errors
///
/// - [`BookingError::InvalidTransition`] if the update contradicts a
///   terminal status
/// - [`BookingError::NotFound`] if the row vanished between rounds
/// - [`BookingError::Persistence`] on store failure, or
///   [`RepositoryError::Conflict`] when every round lost the race
pub async fn settle(
    bookings: &dyn BookingRepository,
    booking: Booking,
    update: &BookingUpdate,
    clock: &dyn Clock,
) -> Result<Settled, BookingError> {
    let id = booking.id;
    let mut current = booking;

    for round in 1..=MAX_ROUNDS {
        let now = clock.now();
        match plan(&current, update, now) {
            Transition::Unchanged => return Ok(Settled::Unchanged(current)),
            Transition::Rejected { current } => {
                return Err(BookingError::InvalidTransition { current });
            }
            Transition::Apply { expected, patch } => {
                if let Some(updated) = bookings.update_status(id, expected, &patch, now).await? {
                    return Ok(Settled::Applied(updated));
                }
                debug!(booking_id = %id, round, "Booking status changed concurrently, reloading");
                current = bookings
                    .get(id)
                    .await?
                    .ok_or_else(|| BookingError::not_found("Booking", id))?
                    .booking;
            }
        }
    }

    Err(RepositoryError::Conflict(format!("booking {id} kept changing during update")).into())
}
