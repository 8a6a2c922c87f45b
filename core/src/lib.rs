//! # Clubpass Core
//!
//! Domain types and collaborator traits for the club ticketing booking core.
//!
//! This crate holds everything that is pure or abstract:
//!
//! - **Types**: identifiers, [`types::Money`] in minor units, tier prices,
//!   carts, events, bookings
//! - **Validation**: field-level checks over untrusted input
//! - **Booking transitions**: the status machine every writer goes through
//! - **Traits**: repositories, payment gateway, auth provider, state store
//!
//! The stateful guards live in `clubpass-runtime`; the HTTP surface lives in
//! the `booking` application crate.
//!
//! ## Example
//!
//! ```
//! use clubpass_core::types::{Money, TicketCounts, TierPrices};
//!
//! let prices = TierPrices {
//!     women: Money::from_paise(50_000),
//!     couple: Money::from_paise(90_000),
//!     stag: Money::from_paise(70_000),
//! };
//! let cart = TicketCounts { women: 2, couple: 1, stag: 0 };
//! assert_eq!(cart.total(&prices), Some(Money::from_paise(190_000)));
//! ```

pub mod auth;
pub mod booking;
pub mod error;
pub mod gateway;
pub mod repository;
pub mod state_store;
pub mod types;
pub mod validation;

pub use error::{AuthError, BookingError, GatewayError, RepositoryError};

/// Environment traits injected into services.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use clubpass_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
