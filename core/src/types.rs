//! Domain types for the booking core.
//!
//! Value objects and entities shared by every layer: identifiers, money in
//! minor units, tier prices and carts, events, profiles and bookings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// First eight hex characters, used where length is capped.
            #[must_use]
            pub fn short(&self) -> String {
                self.0.simple().to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a club event
    EventId
}

uuid_id! {
    /// Unique identifier for a user (issued by the auth provider)
    UserId
}

uuid_id! {
    /// Unique identifier for a booking
    BookingId
}

// ============================================================================
// Money
// ============================================================================

/// Amount of money in minor units (paise).
///
/// All arithmetic on prices happens here, in integers. Decimal rupee values
/// only appear at the edges: untrusted input and JSON output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

/// Largest rupee value accepted when converting from a decimal.
const MAX_CONVERTIBLE_RUPEES: f64 = 1e13;

impl Money {
    /// Zero rupees.
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from paise
    #[must_use]
    pub const fn from_paise(paise: u64) -> Self {
        Self(paise)
    }

    /// Creates a `Money` value from whole rupees, `None` on overflow.
    #[must_use]
    pub const fn checked_from_rupees(rupees: u64) -> Option<Self> {
        match rupees.checked_mul(100) {
            Some(paise) => Some(Self(paise)),
            None => None,
        }
    }

    /// Converts a decimal rupee amount.
    ///
    /// Returns `None` for negative or non-finite values and for values with
    /// more than two decimal places (`10.005`).
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn try_from_rupees(rupees: f64) -> Option<Self> {
        if !rupees.is_finite() || rupees < 0.0 || rupees > MAX_CONVERTIBLE_RUPEES {
            return None;
        }
        if !has_at_most_two_decimals(rupees) {
            return None;
        }
        // Range checked above, so the cast is exact after rounding.
        Some(Self((rupees * 100.0).round() as u64))
    }

    /// Returns the amount in paise
    #[must_use]
    pub const fn paise(&self) -> u64 {
        self.0
    }

    /// Returns the amount in rupees as a decimal (display only).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_rupees(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies by a ticket count with overflow checking
    #[must_use]
    pub const fn checked_mul(self, count: u32) -> Option<Self> {
        match self.0.checked_mul(count as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Absolute difference between two amounts.
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> Self {
        Self(self.0.abs_diff(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Whether `value` has at most two decimal places.
///
/// Tolerates binary floating-point noise (`19.99 * 100 = 1998.9999…`) but
/// rejects a genuine third decimal (`10.005`).
#[must_use]
pub fn has_at_most_two_decimals(value: f64) -> bool {
    let scaled = value * 100.0;
    (scaled - scaled.round()).abs() < 1e-6
}

// ============================================================================
// Tiers and carts
// ============================================================================

/// Ticket tier offered for every event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketTier {
    /// Single woman entry
    Women,
    /// Couple entry
    Couple,
    /// Single man entry
    Stag,
}

impl TicketTier {
    /// All tiers, in display order.
    pub const ALL: [Self; 3] = [Self::Women, Self::Couple, Self::Stag];

    /// Wire name of the tier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Women => "women",
            Self::Couple => "couple",
            Self::Stag => "stag",
        }
    }
}

impl fmt::Display for TicketTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tier prices of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPrices {
    /// Price of a women ticket
    pub women: Money,
    /// Price of a couple ticket
    pub couple: Money,
    /// Price of a stag ticket
    pub stag: Money,
}

impl TierPrices {
    /// Price of one ticket in `tier`.
    #[must_use]
    pub const fn price(&self, tier: TicketTier) -> Money {
        match tier {
            TicketTier::Women => self.women,
            TicketTier::Couple => self.couple,
            TicketTier::Stag => self.stag,
        }
    }
}

/// Ticket counts per tier (a validated cart, or the counts on a booking).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketCounts {
    /// Women tickets
    pub women: u32,
    /// Couple tickets
    pub couple: u32,
    /// Stag tickets
    pub stag: u32,
}

impl TicketCounts {
    /// Count for one tier.
    #[must_use]
    pub const fn count(&self, tier: TicketTier) -> u32 {
        match tier {
            TicketTier::Women => self.women,
            TicketTier::Couple => self.couple,
            TicketTier::Stag => self.stag,
        }
    }

    /// Total number of tickets across tiers.
    #[must_use]
    pub const fn total_tickets(&self) -> u32 {
        self.women
            .saturating_add(self.couple)
            .saturating_add(self.stag)
    }

    /// Whether at least one tier has a nonzero count.
    #[must_use]
    pub const fn is_payable(&self) -> bool {
        self.total_tickets() > 0
    }

    /// Σ(count × tier price), exact; `None` on overflow.
    #[must_use]
    pub fn total(&self, prices: &TierPrices) -> Option<Money> {
        TicketTier::ALL
            .iter()
            .try_fold(Money::ZERO, |acc, tier| {
                prices
                    .price(*tier)
                    .checked_mul(self.count(*tier))
                    .and_then(|line| acc.checked_add(line))
            })
    }
}

// ============================================================================
// Events and profiles
// ============================================================================

/// A club night. Read-only for the booking core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Title shown to users
    pub title: String,
    /// Optional long description
    pub description: Option<String>,
    /// When the event takes place
    pub event_date: DateTime<Utc>,
    /// Headlining DJ
    pub dj_name: Option<String>,
    /// Tier prices
    pub prices: TierPrices,
    /// Poster image URL
    pub poster_image_url: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Compact view embedded in booking responses.
    #[must_use]
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            id: self.id,
            title: self.title.clone(),
            event_date: self.event_date,
            dj_name: self.dj_name.clone(),
            poster_image_url: self.poster_image_url.clone(),
        }
    }
}

/// Event fields joined onto a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Event identifier
    pub id: EventId,
    /// Title
    pub title: String,
    /// Date
    pub event_date: DateTime<Utc>,
    /// DJ
    pub dj_name: Option<String>,
    /// Poster
    pub poster_image_url: Option<String>,
}

/// Profile row for an authenticated user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same id as the auth user
    pub id: UserId,
    /// Email address
    pub email: String,
    /// Full name, if the user supplied one
    pub full_name: Option<String>,
}

impl Profile {
    /// Name shown on the checkout form: full name, falling back to email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

// ============================================================================
// Bookings
// ============================================================================

/// Lifecycle status of a booking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Gateway order created, payment not yet confirmed
    Pending,
    /// Payment confirmed (terminal)
    #[serde(alias = "paid")]
    Confirmed,
    /// Payment failed (terminal)
    Failed,
    /// Cancelled out of band (terminal)
    Cancelled,
}

impl BookingStatus {
    /// Storage and wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further status change is allowed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown status strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown booking status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            // Legacy rows written before "confirmed" existed.
            "confirmed" | "paid" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A persisted booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking identifier
    pub id: BookingId,
    /// Event booked
    pub event_id: EventId,
    /// Owner
    pub user_id: UserId,
    /// Per-tier counts
    pub tickets: TicketCounts,
    /// Sum of all tier counts
    pub num_of_tickets: u32,
    /// Server-computed total
    pub total_amount: Money,
    /// Current status
    pub status: BookingStatus,
    /// Gateway order id
    pub razorpay_order_id: String,
    /// Gateway payment id, once known
    pub razorpay_payment_id: Option<String>,
    /// Checkout signature, once verified
    pub razorpay_signature: Option<String>,
    /// Receipt sent to the gateway
    pub receipt_id: String,
    /// Why the payment failed
    pub failure_reason: Option<String>,
    /// When the payment was confirmed
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Whether a webhook delivered the final status
    pub webhook_confirmed: bool,
    /// Amount reported by `order.paid`
    pub amount_paid: Option<Money>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// A booking joined with its event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingDetails {
    /// The booking
    #[serde(flatten)]
    pub booking: Booking,
    /// Joined event fields
    pub event: EventSummary,
}

/// Fields for inserting a new `pending` booking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBooking {
    /// Booking identifier
    pub id: BookingId,
    /// Event booked
    pub event_id: EventId,
    /// Owner
    pub user_id: UserId,
    /// Per-tier counts
    pub tickets: TicketCounts,
    /// Server-computed total
    pub total_amount: Money,
    /// Gateway order id
    pub razorpay_order_id: String,
    /// Receipt sent to the gateway
    pub receipt_id: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl NewBooking {
    /// The row as it looks right after insertion.
    #[must_use]
    pub fn into_booking(self) -> Booking {
        Booking {
            id: self.id,
            event_id: self.event_id,
            user_id: self.user_id,
            num_of_tickets: self.tickets.total_tickets(),
            tickets: self.tickets,
            total_amount: self.total_amount,
            status: BookingStatus::Pending,
            razorpay_order_id: self.razorpay_order_id,
            razorpay_payment_id: None,
            razorpay_signature: None,
            receipt_id: self.receipt_id,
            failure_reason: None,
            confirmed_at: None,
            webhook_confirmed: false,
            amount_paid: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
