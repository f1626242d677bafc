//! Booking entity model.

use chrono::{DateTime, Utc};
use eventbook_core::types::{BookingId, EventId, UserId};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::BookingStatus;
use crate::event::Event;

/// A reservation of one or more seats at an event. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Booking {
    /// Unique booking identifier.
    pub id: BookingId,
    /// Event the seats belong to.
    pub event_id: EventId,
    /// User holding the seats.
    pub user_id: UserId,
    /// Number of seats held, at least one.
    pub seat_count: i32,
    /// Lifecycle state.
    pub status: BookingStatus,
    /// Opaque token used to confirm the booking.
    pub booking_code: String,
    /// When the booking was created.
    pub created_at: DateTime<Utc>,
    /// Deadline for confirmation while pending.
    pub expires_at: DateTime<Utc>,
    /// When the booking was confirmed.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// When the booking was cancelled, manually or by expiry.
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// A pending booking whose reservation window closed before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && self.expires_at < now
    }

    /// Whether `user_id` owns this booking.
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

/// A pending booking about to be inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBooking {
    /// Pre-generated identifier.
    pub id: BookingId,
    /// Event the seats belong to.
    pub event_id: EventId,
    /// User taking the seats.
    pub user_id: UserId,
    /// Number of seats.
    pub seat_count: i32,
    /// Unique confirmation token.
    pub booking_code: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// `created_at` plus the event's reservation lifespan.
    pub expires_at: DateTime<Utc>,
}

impl NewBooking {
    /// Prepare a pending booking against `event`, expiring one lifespan
    /// after `now`.
    pub fn for_event(
        event: &Event,
        user_id: UserId,
        seat_count: i32,
        booking_code: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: BookingId::new(),
            event_id: event.id,
            user_id,
            seat_count,
            booking_code,
            created_at: now,
            expires_at: now + event.reservation_lifespan(),
        }
    }

    /// The row as it looks once inserted.
    pub fn into_booking(self) -> Booking {
        Booking {
            id: self.id,
            event_id: self.event_id,
            user_id: self.user_id,
            seat_count: self.seat_count,
            status: BookingStatus::Pending,
            booking_code: self.booking_code,
            created_at: self.created_at,
            expires_at: self.expires_at,
            confirmed_at: None,
            cancelled_at: None,
        }
    }
}
