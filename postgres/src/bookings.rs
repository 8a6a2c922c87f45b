//! Booking rows.

use crate::db_error;
use crate::rows::{
    BOOKING_COLUMNS, BookingDetailsRow, BookingRow, EVENT_SUMMARY_COLUMNS, to_db_count,
    to_db_money,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clubpass_core::booking::BookingPatch;
use clubpass_core::error::RepositoryError;
use clubpass_core::repository::BookingRepository;
use clubpass_core::types::{Booking, BookingDetails, BookingId, BookingStatus, NewBooking, UserId};
use sqlx::PgPool;

/// `PostgreSQL` booking repository.
///
/// Status changes are single `UPDATE … WHERE id = $1 AND status = $2`
/// statements, so concurrent confirmations from the checkout and the
/// webhook never both apply.
#[derive(Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn joined(filter: &str) -> String {
        format!(
            "SELECT {BOOKING_COLUMNS}, {EVENT_SUMMARY_COLUMNS} \
             FROM bookings b JOIN events e ON e.id = b.event_id {filter}"
        )
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn insert(&self, booking: NewBooking) -> Result<Booking, RepositoryError> {
        let row: BookingRow = sqlx::query_as(&format!(
            r"
            INSERT INTO bookings AS b (
                id, event_id, user_id, women_count, couple_count, stag_count,
                num_of_tickets, total_amount, status, razorpay_order_id, receipt_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending', $9, $10, $11, $11)
            RETURNING {BOOKING_COLUMNS}
            "
        ))
        .bind(booking.id.as_uuid())
        .bind(booking.event_id.as_uuid())
        .bind(booking.user_id.as_uuid())
        .bind(to_db_count(booking.tickets.women)?)
        .bind(to_db_count(booking.tickets.couple)?)
        .bind(to_db_count(booking.tickets.stag)?)
        .bind(to_db_count(booking.tickets.total_tickets())?)
        .bind(to_db_money(booking.total_amount)?)
        .bind(&booking.razorpay_order_id)
        .bind(&booking.receipt_id)
        .bind(booking.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to insert booking", &e))?;

        tracing::debug!(
            booking_id = %booking.id,
            order_id = %booking.razorpay_order_id,
            "Booking inserted"
        );

        Booking::try_from(row)
    }

    async fn get(&self, id: BookingId) -> Result<Option<BookingDetails>, RepositoryError> {
        sqlx::query_as::<_, BookingDetailsRow>(&Self::joined("WHERE b.id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load booking", &e))?
            .map(BookingDetails::try_from)
            .transpose()
    }

    async fn find_by_id_and_order(
        &self,
        id: BookingId,
        order_id: &str,
    ) -> Result<Option<BookingDetails>, RepositoryError> {
        sqlx::query_as::<_, BookingDetailsRow>(&Self::joined(
            "WHERE b.id = $1 AND b.razorpay_order_id = $2",
        ))
        .bind(id.as_uuid())
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load booking", &e))?
        .map(BookingDetails::try_from)
        .transpose()
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<Booking>, RepositoryError> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.razorpay_order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load booking by order", &e))?
        .map(Booking::try_from)
        .transpose()
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<BookingDetails>, RepositoryError> {
        sqlx::query_as::<_, BookingDetailsRow>(&Self::joined(
            "WHERE b.user_id = $1 ORDER BY b.created_at DESC",
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list bookings", &e))?
        .into_iter()
        .map(BookingDetails::try_from)
        .collect()
    }

    async fn update_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        patch: &BookingPatch,
        at: DateTime<Utc>,
    ) -> Result<Option<Booking>, RepositoryError> {
        let amount_paid = patch.amount_paid.map(to_db_money).transpose()?;

        let row: Option<BookingRow> = sqlx::query_as(&format!(
            r"
            UPDATE bookings AS b SET
                status = $3,
                razorpay_payment_id = COALESCE($4, b.razorpay_payment_id),
                razorpay_signature = COALESCE($5, b.razorpay_signature),
                failure_reason = COALESCE($6, b.failure_reason),
                confirmed_at = COALESCE($7, b.confirmed_at),
                webhook_confirmed = COALESCE($8, b.webhook_confirmed),
                amount_paid = COALESCE($9, b.amount_paid),
                updated_at = $10
            WHERE b.id = $1 AND b.status = $2
            RETURNING {BOOKING_COLUMNS}
            "
        ))
        .bind(id.as_uuid())
        .bind(expected.as_str())
        .bind(patch.status.as_str())
        .bind(&patch.razorpay_payment_id)
        .bind(&patch.razorpay_signature)
        .bind(&patch.failure_reason)
        .bind(patch.confirmed_at)
        .bind(patch.webhook_confirmed)
        .bind(amount_paid)
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update booking status", &e))?;

        row.map(Booking::try_from).transpose()
    }

    async fn list_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, RepositoryError> {
        sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b \
             WHERE b.status = 'pending' AND b.created_at < $1 ORDER BY b.created_at"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list stale bookings", &e))?
        .into_iter()
        .map(Booking::try_from)
        .collect()
    }
}
