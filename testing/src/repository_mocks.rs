//! In-memory repositories.
//!
//! Same observable behavior as the `PostgreSQL` repositories: unique order
//! ids, joined event summaries, newest-first listings and compare-and-set
//! status updates.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clubpass_core::booking::BookingPatch;
use clubpass_core::error::RepositoryError;
use clubpass_core::repository::{BookingRepository, EventRepository, ProfileRepository};
use clubpass_core::types::{
    Booking, BookingDetails, BookingId, BookingStatus, Event, EventId, NewBooking, Profile, UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Events keyed by id.
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventRepository {
    events: Arc<RwLock<HashMap<EventId, Event>>>,
}

impl InMemoryEventRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event.
    pub fn add(&self, event: Event) {
        self.events.write().unwrap().insert(event.id, event);
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn get(&self, id: EventId) -> Result<Option<Event>, RepositoryError> {
        Ok(self.events.read().unwrap().get(&id).cloned())
    }

    async fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Event>, RepositoryError> {
        let mut events: Vec<_> = self
            .events
            .read()
            .unwrap()
            .values()
            .filter(|e| e.event_date >= now)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_date);
        Ok(events)
    }
}

/// Profiles keyed by user id.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProfileRepository {
    profiles: Arc<RwLock<HashMap<UserId, Profile>>>,
}

impl InMemoryProfileRepository {
    /// Empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a profile.
    pub fn add(&self, profile: Profile) {
        self.profiles.write().unwrap().insert(profile.id, profile);
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn get(&self, id: UserId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.profiles.read().unwrap().get(&id).cloned())
    }

    async fn upsert(&self, profile: &Profile) -> Result<(), RepositoryError> {
        self.add(profile.clone());
        Ok(())
    }
}

/// Bookings, joined against an [`InMemoryEventRepository`].
///
/// [`fail_writes`](Self::fail_writes) makes inserts and updates return
/// [`RepositoryError::Database`], for exercising persistence failure paths.
#[derive(Clone, Debug)]
pub struct InMemoryBookingRepository {
    bookings: Arc<RwLock<HashMap<BookingId, Booking>>>,
    events: InMemoryEventRepository,
    failing: Arc<AtomicBool>,
}

impl InMemoryBookingRepository {
    /// Empty repository joining against `events`.
    #[must_use]
    pub fn new(events: InMemoryEventRepository) -> Self {
        Self {
            bookings: Arc::new(RwLock::new(HashMap::new())),
            events,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Toggle write failures.
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Seed a booking row directly.
    pub fn add(&self, booking: Booking) {
        self.bookings.write().unwrap().insert(booking.id, booking);
    }

    /// Raw row, without the event join.
    #[must_use]
    pub fn row(&self, id: BookingId) -> Option<Booking> {
        self.bookings.read().unwrap().get(&id).cloned()
    }

    /// Number of stored bookings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bookings.read().unwrap().len()
    }

    /// Whether no booking is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(RepositoryError::Database("simulated write failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn join(&self, booking: Booking) -> Option<BookingDetails> {
        let events = self.events.events.read().unwrap();
        let event = events.get(&booking.event_id)?.summary();
        Some(BookingDetails { booking, event })
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        self.check_writable()?;
        let mut bookings = self.bookings.write().unwrap();
        if bookings.contains_key(&booking.id)
            || bookings
                .values()
                .any(|b| b.razorpay_order_id == booking.razorpay_order_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "booking for order {} already exists",
                booking.razorpay_order_id
            )));
        }
        let row = booking.into_booking();
        bookings.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get(&self, id: BookingId) -> Result<Option<BookingDetails>, RepositoryError> {
        Ok(self.row(id).and_then(|b| self.join(b)))
    }

    async fn find_by_id_and_order(
        &self,
        id: BookingId,
        order_id: &str,
    ) -> Result<Option<BookingDetails>, RepositoryError> {
        Ok(self
            .row(id)
            .filter(|b| b.razorpay_order_id == order_id)
            .and_then(|b| self.join(b)))
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Booking>, RepositoryError> {
        Ok(self
            .bookings
            .read()
            .unwrap()
            .values()
            .find(|b| b.razorpay_order_id == order_id)
            .cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<BookingDetails>, RepositoryError> {
        let mut rows: Vec<_> = self
            .bookings
            .read()
            .unwrap()
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows.into_iter().filter_map(|b| self.join(b)).collect())
    }

    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        patch: &BookingPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<Booking>, RepositoryError> {
        self.check_writable()?;
        let mut bookings = self.bookings.write().unwrap();
        match bookings.get_mut(&id) {
            Some(booking) if booking.status == expected => {
                patch.apply_to(booking, at);
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, RepositoryError> {
        Ok(self
            .bookings
            .read()
            .unwrap()
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::mocks::epoch;
    use clubpass_core::types::{Money, TicketCounts};

    fn new_booking(event: EventId, user: UserId, order_id: &str) -> NewBooking {
        NewBooking {
            id: BookingId::new(),
            event_id: event,
            user_id: user,
            tickets: TicketCounts {
                women: 2,
                couple: 1,
                stag: 0,
            },
            total_amount: Money::from_paise(190_000),
            razorpay_order_id: order_id.to_string(),
            receipt_id: "CTH_test".to_string(),
            created_at: epoch(),
        }
    }

    fn confirm_patch() -> BookingPatch {
        BookingPatch {
            status: BookingStatus::Confirmed,
            razorpay_payment_id: Some("pay_1".to_string()),
            razorpay_signature: None,
            failure_reason: None,
            confirmed_at: Some(epoch()),
            webhook_confirmed: None,
            amount_paid: None,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_order_id() {
        let repo = InMemoryBookingRepository::new(InMemoryEventRepository::new());
        let user = UserId::new();
        let event = EventId::new();
        assert!(repo.insert(new_booking(event, user, "order_1")).await.is_ok());
        assert!(matches!(
            repo.insert(new_booking(event, user, "order_1")).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_is_compare_and_set() {
        let events = InMemoryEventRepository::new();
        let event = fixtures::event();
        events.add(event.clone());
        let repo = InMemoryBookingRepository::new(events);
        let booking = repo
            .insert(new_booking(event.id, UserId::new(), "order_1"))
            .await
            .unwrap();

        let first = repo
            .update_status(booking.id, BookingStatus::Pending, &confirm_patch(), epoch())
            .await
            .unwrap();
        assert_eq!(first.unwrap().status, BookingStatus::Confirmed);

        let second = repo
            .update_status(booking.id, BookingStatus::Pending, &confirm_patch(), epoch())
            .await
            .unwrap();
        assert!(second.is_none());

        let details = repo.get(booking.id).await.unwrap().unwrap();
        assert_eq!(details.event.title, event.title);
    }

    #[tokio::test]
    async fn test_find_by_id_and_order_requires_both() {
        let events = InMemoryEventRepository::new();
        let event = fixtures::event();
        events.add(event.clone());
        let repo = InMemoryBookingRepository::new(events);
        let booking = repo
            .insert(new_booking(event.id, UserId::new(), "order_1"))
            .await
            .unwrap();

        assert!(repo.find_by_id_and_order(booking.id, "order_1").await.unwrap().is_some());
        assert!(repo.find_by_id_and_order(booking.id, "order_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upcoming_events_sorted() {
        let events = InMemoryEventRepository::new();
        let mut later = fixtures::event();
        later.event_date += chrono::Duration::days(3);
        let sooner = fixtures::event();
        let mut past = fixtures::event();
        past.event_date = epoch() - chrono::Duration::days(1);
        events.add(later.clone());
        events.add(sooner.clone());
        events.add(past);

        let upcoming = events.list_upcoming(epoch()).await.unwrap();
        assert_eq!(upcoming, vec![sooner, later]);
    }
}
