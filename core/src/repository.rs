//! Persistence traits.
//!
//! Implemented over `PostgreSQL` by `clubpass-postgres` and in memory by
//! `clubpass-testing`.

use crate::booking::BookingPatch;
use crate::error::RepositoryError;
use crate::types::{
    Booking, BookingDetails, BookingId, BookingStatus, Event, EventId, NewBooking, Profile, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read access to club events.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Load one event.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn get(&self, id: EventId) -> Result<Option<Event>, RepositoryError>;

    /// Events dated at or after `now`, earliest first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Event>, RepositoryError>;
}

/// User profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Load a profile.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn get(&self, id: UserId) -> Result<Option<Profile>, RepositoryError>;

    /// Insert or replace a profile.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn upsert(&self, profile: &Profile) -> Result<(), RepositoryError>;
}

/// Booking rows.
///
/// Status changes only go through [`BookingRepository::update_status`], which
/// is a compare-and-set on the current status.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Insert a new `pending` booking.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] if the id or order id is taken.
    async fn insert(&self, booking: NewBooking) -> Result<Booking, RepositoryError>;

    /// Load a booking joined with its event.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn get(&self, id: BookingId) -> Result<Option<BookingDetails>, RepositoryError>;

    /// Load a booking only if it carries `order_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn find_by_id_and_order(
        &self,
        id: BookingId,
        order_id: &str,
    ) -> Result<Option<BookingDetails>, RepositoryError>;

    /// Load the booking created for a gateway order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Booking>, RepositoryError>;

    /// A user's bookings with event details, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<BookingDetails>, RepositoryError>;

    /// Apply `patch` only if the stored status is still `expected`.
    ///
    /// Returns the updated row, or `None` when the status no longer matched
    /// (another writer got there first) or the booking does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        patch: &BookingPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<Booking>, RepositoryError>;

    /// Pending bookings created before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store fails.
    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, RepositoryError>;
}
