//! Inventory ledger trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use eventbook_core::result::AppResult;
use eventbook_core::types::{BookingId, EventId, UserId};
use eventbook_entity::booking::{Booking, ReleaseGuard, ReleaseOutcome};
use eventbook_entity::event::Event;
use eventbook_entity::user::User;

/// Transactional access to events, bookings and their seat counts.
///
/// For every event, `available_seats` equals `total_seats` minus the seats
/// of its pending and confirmed bookings. Each mutating method is one
/// atomic unit: it either applies fully or leaves no trace, and it reads
/// the values it decides on under an exclusive lock held until it applies.
#[async_trait]
pub trait InventoryLedger: Send + Sync + std::fmt::Debug {
    /// Look up an account.
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>>;

    /// Persist a new event.
    async fn insert_event(&self, event: Event) -> AppResult<Event>;

    /// Look up an event.
    async fn find_event(&self, id: EventId) -> AppResult<Option<Event>>;

    /// All events, newest first.
    async fn list_events(&self) -> AppResult<Vec<Event>>;

    /// Lock the event, check self-booking and capacity, decrement and insert
    /// a pending booking carrying `booking_code`.
    async fn reserve(
        &self,
        event_id: EventId,
        user_id: UserId,
        seat_count: i32,
        booking_code: String,
        now: DateTime<Utc>,
    ) -> AppResult<Booking>;

    /// Lock the pending booking with `booking_code` and mark it confirmed.
    async fn confirm_pending(&self, booking_code: &str, now: DateTime<Utc>) -> AppResult<Booking>;

    /// Lock the booking, cancel it if `guard` admits it, and return its
    /// seats if it was still active.
    async fn release(
        &self,
        booking_id: BookingId,
        guard: ReleaseGuard,
        now: DateTime<Utc>,
    ) -> AppResult<(Booking, ReleaseOutcome)>;

    /// Look up a booking by ID.
    async fn find_booking(&self, id: BookingId) -> AppResult<Option<Booking>>;

    /// Look up a booking by confirmation code.
    async fn find_booking_by_code(&self, booking_code: &str) -> AppResult<Option<Booking>>;

    /// Up to `limit` pending bookings with `expires_at < now`, oldest first.
    async fn find_expired_pending(&self, now: DateTime<Utc>, limit: i64)
    -> AppResult<Vec<Booking>>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> AppResult<()>;
}
