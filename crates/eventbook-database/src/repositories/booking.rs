//! Booking repository implementation.
//!
//! Every method that changes seat inventory runs in a single transaction and
//! takes `FOR UPDATE` row locks before reading the values it acts on. Lock
//! order is event-only for reservations and booking → event for releases.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use eventbook_core::error::AppError;
use eventbook_core::result::AppResult;
use eventbook_core::types::{BookingId, EventId, UserId};
use eventbook_entity::booking::{
    Booking, BookingStatus, NewBooking, ReleaseGuard, ReleaseOutcome,
};
use eventbook_entity::event::Event;

use crate::error::{classify, commit_failed};

/// Repository for booking lifecycle transitions.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Create a new booking repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Take `seat_count` seats on an event and insert a pending booking.
    ///
    /// The event row stays locked from the availability check until the
    /// decrement and the insert commit together.
    pub async fn reserve(
        &self,
        event_id: EventId,
        user_id: UserId,
        seat_count: i32,
        booking_code: String,
        now: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify("Failed to begin transaction", e))?;

        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
            .bind(event_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| classify("Failed to lock event", e))?
            .ok_or_else(|| AppError::event_not_found(event_id))?;

        event.check_reservation(user_id, seat_count)?;

        sqlx::query(
            "UPDATE events SET available_seats = available_seats - $2, updated_at = $3 \
             WHERE id = $1",
        )
        .bind(event_id)
        .bind(seat_count)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify("Failed to decrement available seats", e))?;

        let new_booking = NewBooking::for_event(&event, user_id, seat_count, booking_code, now);
        let booking = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, event_id, user_id, seat_count, status, booking_code, \
             created_at, expires_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *",
        )
        .bind(new_booking.id)
        .bind(new_booking.event_id)
        .bind(new_booking.user_id)
        .bind(new_booking.seat_count)
        .bind(BookingStatus::Pending)
        .bind(&new_booking.booking_code)
        .bind(new_booking.created_at)
        .bind(new_booking.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify("Failed to insert booking", e))?;

        tx.commit().await.map_err(commit_failed)?;
        Ok(booking)
    }

    /// Promote the pending booking with `booking_code` to confirmed.
    ///
    /// Bookings that are already confirmed or cancelled do not match.
    pub async fn confirm_pending(
        &self,
        booking_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify("Failed to begin transaction", e))?;

        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE booking_code = $1 AND status = $2 FOR UPDATE",
        )
        .bind(booking_code)
        .bind(BookingStatus::Pending)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| classify("Failed to lock booking", e))?
        .ok_or_else(|| {
            AppError::booking_not_found(format!("No pending booking with code {booking_code}"))
        })?;

        let confirmed = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $2, confirmed_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(booking.id)
        .bind(BookingStatus::Confirmed)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify("Failed to confirm booking", e))?;

        tx.commit().await.map_err(commit_failed)?;
        Ok(confirmed)
    }

    /// Cancel a booking if `guard` admits it and return its seats.
    ///
    /// Status and seat count are read under the booking lock, so concurrent
    /// releases of the same booking return seats exactly once.
    pub async fn release(
        &self,
        booking_id: BookingId,
        guard: ReleaseGuard,
        now: DateTime<Utc>,
    ) -> AppResult<(Booking, ReleaseOutcome)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify("Failed to begin transaction", e))?;

        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(booking_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| classify("Failed to lock booking", e))?
            .ok_or_else(|| AppError::booking_not_found(format!("Booking {booking_id} not found")))?;

        let outcome = ReleaseOutcome::decide(&booking, guard);
        if !outcome.mutates() {
            debug!(booking_id = %booking_id, ?outcome, "Release left booking unchanged");
            tx.commit().await.map_err(commit_failed)?;
            return Ok((booking, outcome));
        }

        let cancelled = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $2, cancelled_at = $3 WHERE id = $1 RETURNING *",
        )
        .bind(booking.id)
        .bind(BookingStatus::Cancelled)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify("Failed to cancel booking", e))?;

        let updated = sqlx::query(
            "UPDATE events SET available_seats = available_seats + $2, updated_at = $3 \
             WHERE id = $1",
        )
        .bind(booking.event_id)
        .bind(outcome.released_seats())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| classify("Failed to release seats", e))?;

        if updated.rows_affected() != 1 {
            return Err(AppError::internal(format!(
                "Event {} of booking {booking_id} disappeared during release",
                booking.event_id
            )));
        }

        tx.commit().await.map_err(commit_failed)?;
        Ok((cancelled, outcome))
    }

    /// Find a booking by ID.
    pub async fn find_by_id(&self, id: BookingId) -> AppResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find booking", e))
    }

    /// Find a booking by its confirmation code.
    pub async fn find_by_code(&self, booking_code: &str) -> AppResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_code = $1")
            .bind(booking_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find booking by code", e))
    }

    /// Pending bookings whose window closed before `now`, oldest first.
    pub async fn find_expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE status = $1 AND expires_at < $2 \
             ORDER BY expires_at ASC LIMIT $3",
        )
        .bind(BookingStatus::Pending)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| classify("Failed to find expired bookings", e))
    }
}
