//! # Clubpass Testing
//!
//! Test doubles and helpers for the Clubpass booking core.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - In-memory repositories with the same compare-and-set semantics as the
//!   `PostgreSQL` ones
//! - A recording payment gateway and a token-table auth provider
//! - Fixtures and proptest strategies for domain types
//!
//! ## Example
//!
//! ```
//! use clubpass_testing::{fixtures, InMemoryEventRepository};
//! use clubpass_core::repository::EventRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let events = InMemoryEventRepository::new();
//! let event = fixtures::event();
//! events.add(event.clone());
//!
//! assert_eq!(events.get(event.id).await?, Some(event));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use clubpass_core::environment::Clock;

pub mod repository_mocks;
pub mod service_mocks;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use clubpass_testing::mocks::FixedClock;
    /// use clubpass_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(epoch())
    }

    /// 2025-01-01 00:00:00 UTC.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the code under test.
    ///
    /// ```
    /// use clubpass_testing::ManualClock;
    /// use clubpass_core::environment::Clock;
    /// use chrono::Duration;
    ///
    /// let clock = ManualClock::default();
    /// let start = clock.now();
    /// clock.advance(Duration::seconds(30));
    /// assert_eq!(clock.now() - start, Duration::seconds(30));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Start at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move forward by `delta`.
        pub fn advance(&self, delta: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += delta;
        }

        /// Jump to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner) = time;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(epoch())
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

/// Ready-made domain values.
pub mod fixtures {
    use super::mocks::epoch;
    use chrono::Duration;
    use clubpass_core::types::{Event, EventId, Money, Profile, TierPrices, UserId};

    /// Women ₹500, couple ₹900, stag ₹700.
    #[must_use]
    pub const fn prices() -> TierPrices {
        TierPrices {
            women: Money::from_paise(50_000),
            couple: Money::from_paise(90_000),
            stag: Money::from_paise(70_000),
        }
    }

    /// An event a week after the test epoch with [`prices`].
    #[must_use]
    pub fn event() -> Event {
        Event {
            id: EventId::new(),
            title: "Saturday Night Live".to_string(),
            description: Some("Techno till late".to_string()),
            event_date: epoch() + Duration::days(7),
            dj_name: Some("DJ Nyx".to_string()),
            prices: prices(),
            poster_image_url: Some("https://cdn.example.com/posters/snl.jpg".to_string()),
            created_at: epoch() - Duration::days(30),
        }
    }

    /// A profile with a full name.
    #[must_use]
    pub fn profile() -> Profile {
        Profile {
            id: UserId::new(),
            email: "asha@example.com".to_string(),
            full_name: Some("Asha Rao".to_string()),
        }
    }
}

/// Property-based testing strategies.
pub mod properties {
    use clubpass_core::types::{Money, TicketCounts, TierPrices};
    use proptest::prelude::*;

    /// Ticket counts within the default per-tier maximum, at least one ticket.
    pub fn payable_cart() -> impl Strategy<Value = TicketCounts> {
        (0u32..=10, 0u32..=10, 0u32..=10)
            .prop_filter("at least one ticket", |(w, c, s)| w + c + s > 0)
            .prop_map(|(women, couple, stag)| TicketCounts {
                women,
                couple,
                stag,
            })
    }

    /// Whole-rupee tier prices between ₹1 and ₹5000.
    pub fn tier_prices() -> impl Strategy<Value = TierPrices> {
        (1u64..=5000, 1u64..=5000, 1u64..=5000).prop_map(|(women, couple, stag)| TierPrices {
            women: Money::from_paise(women * 100),
            couple: Money::from_paise(couple * 100),
            stag: Money::from_paise(stag * 100),
        })
    }
}

pub use mocks::{FixedClock, ManualClock, test_clock};
pub use repository_mocks::{
    InMemoryBookingRepository, InMemoryEventRepository, InMemoryProfileRepository,
};
pub use service_mocks::{MockAuthProvider, MockPaymentGateway};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::default();
        let other = clock.clone();
        clock.advance(Duration::minutes(5));
        assert_eq!(other.now(), mocks::epoch() + Duration::minutes(5));
    }
}
