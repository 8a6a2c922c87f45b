//! Row structs and their conversion into domain types.

use chrono::{DateTime, Utc};
use clubpass_core::error::RepositoryError;
use clubpass_core::types::{
    Booking, BookingDetails, BookingId, BookingStatus, Event, EventId, EventSummary, Money,
    TicketCounts, TierPrices, UserId,
};
use uuid::Uuid;

pub(crate) const BOOKING_COLUMNS: &str = "b.id, b.event_id, b.user_id, b.women_count, \
    b.couple_count, b.stag_count, b.num_of_tickets, b.total_amount, b.status, \
    b.razorpay_order_id, b.razorpay_payment_id, b.razorpay_signature, b.receipt_id, \
    b.failure_reason, b.confirmed_at, b.webhook_confirmed, b.amount_paid, b.created_at, \
    b.updated_at";

pub(crate) const EVENT_SUMMARY_COLUMNS: &str = "e.title AS event_title, \
    e.event_date AS event_date, e.dj_name AS event_dj_name, \
    e.poster_image_url AS event_poster_image_url";

pub(crate) const EVENT_COLUMNS: &str = "id, title, description, event_date, dj_name, \
    women_price, couple_price, stag_price, poster_image_url, created_at";

fn corrupt(column: &str, value: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::CorruptRow(format!("{column} out of range: {value}"))
}

pub(crate) fn money(column: &str, value: i64) -> Result<Money, RepositoryError> {
    u64::try_from(value)
        .map(Money::from_paise)
        .map_err(|_| corrupt(column, value))
}

fn count(column: &str, value: i32) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| corrupt(column, value))
}

pub(crate) fn to_db_money(value: Money) -> Result<i64, RepositoryError> {
    i64::try_from(value.paise()).map_err(|_| corrupt("amount", value.paise()))
}

pub(crate) fn to_db_count(value: u32) -> Result<i32, RepositoryError> {
    i32::try_from(value).map_err(|_| corrupt("count", value))
}

#[derive(sqlx::FromRow)]
pub(crate) struct EventRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    event_date: DateTime<Utc>,
    dj_name: Option<String>,
    women_price: i64,
    couple_price: i64,
    stag_price: i64,
    poster_image_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = RepositoryError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EventId::from_uuid(row.id),
            title: row.title,
            description: row.description,
            event_date: row.event_date,
            dj_name: row.dj_name,
            prices: TierPrices {
                women: money("women_price", row.women_price)?,
                couple: money("couple_price", row.couple_price)?,
                stag: money("stag_price", row.stag_price)?,
            },
            poster_image_url: row.poster_image_url,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingRow {
    id: Uuid,
    event_id: Uuid,
    user_id: Uuid,
    women_count: i32,
    couple_count: i32,
    stag_count: i32,
    num_of_tickets: i32,
    total_amount: i64,
    status: String,
    razorpay_order_id: String,
    razorpay_payment_id: Option<String>,
    razorpay_signature: Option<String>,
    receipt_id: String,
    failure_reason: Option<String>,
    confirmed_at: Option<DateTime<Utc>>,
    webhook_confirmed: bool,
    amount_paid: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status: BookingStatus = row
            .status
            .parse()
            .map_err(|e| RepositoryError::CorruptRow(format!("{e}")))?;

        Ok(Self {
            id: BookingId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            user_id: UserId::from_uuid(row.user_id),
            tickets: TicketCounts {
                women: count("women_count", row.women_count)?,
                couple: count("couple_count", row.couple_count)?,
                stag: count("stag_count", row.stag_count)?,
            },
            num_of_tickets: count("num_of_tickets", row.num_of_tickets)?,
            total_amount: money("total_amount", row.total_amount)?,
            status,
            razorpay_order_id: row.razorpay_order_id,
            razorpay_payment_id: row.razorpay_payment_id,
            razorpay_signature: row.razorpay_signature,
            receipt_id: row.receipt_id,
            failure_reason: row.failure_reason,
            confirmed_at: row.confirmed_at,
            webhook_confirmed: row.webhook_confirmed,
            amount_paid: row
                .amount_paid
                .map(|v| money("amount_paid", v))
                .transpose()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct BookingDetailsRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    event_title: String,
    event_date: DateTime<Utc>,
    event_dj_name: Option<String>,
    event_poster_image_url: Option<String>,
}

impl TryFrom<BookingDetailsRow> for BookingDetails {
    type Error = RepositoryError;

    fn try_from(row: BookingDetailsRow) -> Result<Self, Self::Error> {
        let booking = Booking::try_from(row.booking)?;
        Ok(Self {
            event: EventSummary {
                id: booking.event_id,
                title: row.event_title,
                event_date: row.event_date,
                dj_name: row.event_dj_name,
                poster_image_url: row.event_poster_image_url,
            },
            booking,
        })
    }
}
