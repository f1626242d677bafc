//! Request DTOs with validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use eventbook_service::CreateEventRequest as SvcCreateEvent;

/// Create event request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateEventRequest {
    /// Display name.
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    /// When the event takes place (RFC 3339).
    pub date: DateTime<Utc>,
    /// Price per seat in minor currency units.
    #[serde(alias = "cost_cents")]
    #[validate(range(min = 0, message = "Cost must not be negative"))]
    pub cost: i64,
    /// Seat capacity.
    #[validate(range(min = 1, message = "An event needs at least one seat"))]
    pub total_seats: i32,
    /// Reservation window, e.g. `15m` or `1h30m`.
    #[validate(length(min = 1, message = "life_span is required"))]
    pub life_span: String,
}

impl From<CreateEventRequest> for SvcCreateEvent {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            name: req.name,
            date: req.date,
            cost_cents: req.cost,
            total_seats: req.total_seats,
            life_span: req.life_span,
        }
    }
}

/// Book seats request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BookRequest {
    /// Number of seats to reserve.
    #[validate(range(min = 1, message = "seat_count must be at least 1"))]
    pub seat_count: i32,
}

/// Confirm booking request body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ConfirmRequest {
    /// Code returned when the booking was made.
    #[validate(length(min = 1, message = "booking_code is required"))]
    pub booking_code: String,
}
