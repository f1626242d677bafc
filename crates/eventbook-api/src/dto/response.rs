//! Response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use eventbook_entity::booking::{Booking, BookingStatus};
use eventbook_entity::event::Event;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Event as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub name: String,
    pub date: DateTime<Utc>,
    /// Price per seat in minor currency units.
    pub cost: i64,
    pub total_seats: i32,
    pub available_seats: i32,
    /// Reservation window, e.g. `15m`.
    pub life_span: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id.into_uuid(),
            name: event.name,
            date: event.date,
            cost: event.cost_cents,
            total_seats: event.total_seats,
            available_seats: event.available_seats,
            life_span: format!("{}m", event.reservation_lifespan_minutes),
            created_by: event.created_by.into_uuid(),
            created_at: event.created_at,
        }
    }
}

/// Booking as returned to its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub seat_count: i32,
    pub status: BookingStatus,
    pub booking_code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id.into_uuid(),
            event_id: booking.event_id.into_uuid(),
            user_id: booking.user_id.into_uuid(),
            seat_count: booking.seat_count,
            status: booking.status,
            booking_code: booking.booking_code,
            created_at: booking.created_at,
            expires_at: booking.expires_at,
            confirmed_at: booking.confirmed_at,
            cancelled_at: booking.cancelled_at,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Store reachability: `connected` or `unavailable`.
    pub store: String,
    /// Version.
    pub version: String,
    /// Seconds since startup.
    pub uptime_seconds: u64,
}
