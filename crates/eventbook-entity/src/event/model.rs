//! Event entity model.

use chrono::{DateTime, TimeDelta, Utc};
use eventbook_core::AppError;
use eventbook_core::types::{EventId, ReservationLifespan, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A bookable event and its seat inventory.
///
/// `available_seats` is the only mutable inventory field. It always equals
/// `total_seats` minus the seats held by pending and confirmed bookings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Price per seat in minor currency units.
    pub cost_cents: i64,
    /// Seat capacity, fixed at creation.
    pub total_seats: i32,
    /// Seats not held by any pending or confirmed booking.
    pub available_seats: i32,
    /// Minutes a pending booking holds its seats before it expires.
    pub reservation_lifespan_minutes: i32,
    /// Organizer who created the event.
    pub created_by: UserId,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
    /// When the event row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Build the initial row for a new event.
    pub fn from_create(input: CreateEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            name: input.name,
            date: input.date,
            cost_cents: input.cost_cents,
            total_seats: input.total_seats,
            available_seats: input.total_seats,
            reservation_lifespan_minutes: input.lifespan.minutes(),
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    /// How long a new pending booking on this event stays valid.
    pub fn reservation_lifespan(&self) -> TimeDelta {
        TimeDelta::minutes(i64::from(self.reservation_lifespan_minutes))
    }

    /// Seats currently held by pending or confirmed bookings.
    pub fn reserved_seats(&self) -> i32 {
        self.total_seats - self.available_seats
    }

    /// Decide whether `user_id` may take `seat_count` seats right now.
    ///
    /// Must be evaluated against a row that is locked for the rest of the
    /// transaction. Self-booking is checked before capacity.
    pub fn check_reservation(&self, user_id: UserId, seat_count: i32) -> Result<(), AppError> {
        if self.created_by == user_id {
            return Err(AppError::self_booking_forbidden());
        }
        if self.available_seats < seat_count {
            return Err(AppError::insufficient_seats(seat_count, self.available_seats));
        }
        Ok(())
    }
}

/// Data required to create a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEvent {
    /// Display name.
    pub name: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Price per seat in minor currency units.
    pub cost_cents: i64,
    /// Seat capacity.
    pub total_seats: i32,
    /// Reservation window for pending bookings.
    pub lifespan: ReservationLifespan,
    /// Organizer creating the event.
    pub created_by: UserId,
}

impl CreateEvent {
    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("Event name must not be empty"));
        }
        if self.total_seats < 1 {
            return Err(AppError::validation("Event must have at least one seat"));
        }
        if self.cost_cents < 0 {
            return Err(AppError::validation("Event cost must not be negative"));
        }
        Ok(())
    }
}
