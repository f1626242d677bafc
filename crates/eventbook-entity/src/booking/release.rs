//! Seat release decisions shared by manual cancellation and expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::Booking;
use super::status::BookingStatus;

/// Condition a locked booking must satisfy before it is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseGuard {
    /// Manual cancellation: any state.
    Any,
    /// Expiry: only a booking still pending whose window closed before the
    /// given instant.
    ExpiredBefore(DateTime<Utc>),
}

/// What a release attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// The booking was active; it is now cancelled and its seats returned.
    Released {
        /// Seats added back to the event.
        seats: i32,
    },
    /// The booking was already cancelled; nothing changed.
    AlreadyCancelled,
    /// The guard rejected the booking (e.g. confirmed in the meantime).
    Skipped {
        /// State observed under the lock.
        status: BookingStatus,
    },
}

impl ReleaseOutcome {
    /// Decide the outcome for `booking` as read under its row lock.
    pub fn decide(booking: &Booking, guard: ReleaseGuard) -> Self {
        if let ReleaseGuard::ExpiredBefore(now) = guard {
            if !booking.is_expired_at(now) {
                return Self::Skipped {
                    status: booking.status,
                };
            }
        }
        if booking.status.holds_seats() {
            Self::Released {
                seats: booking.seat_count,
            }
        } else {
            Self::AlreadyCancelled
        }
    }

    /// Seats returned to the event by this outcome.
    pub fn released_seats(&self) -> i32 {
        match self {
            Self::Released { seats } => *seats,
            _ => 0,
        }
    }

    /// Whether the booking row must be written.
    pub fn mutates(&self) -> bool {
        matches!(self, Self::Released { .. })
    }
}
