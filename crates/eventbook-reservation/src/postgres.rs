//! PostgreSQL-backed ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use eventbook_core::result::AppResult;
use eventbook_core::types::{BookingId, EventId, UserId};
use eventbook_database::DatabasePool;
use eventbook_database::repositories::{BookingRepository, EventRepository, UserRepository};
use eventbook_entity::booking::{Booking, ReleaseGuard, ReleaseOutcome};
use eventbook_entity::event::Event;
use eventbook_entity::user::User;

use crate::ledger::InventoryLedger;

/// Ledger whose locks are PostgreSQL row locks (`SELECT ... FOR UPDATE`).
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    db: DatabasePool,
    users: UserRepository,
    events: EventRepository,
    bookings: BookingRepository,
}

impl PostgresLedger {
    /// Build the ledger over an open pool.
    pub fn new(db: DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            bookings: BookingRepository::new(pool),
            db,
        }
    }
}

#[async_trait]
impl InventoryLedger for PostgresLedger {
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    async fn insert_event(&self, event: Event) -> AppResult<Event> {
        self.events.create(&event).await
    }

    async fn find_event(&self, id: EventId) -> AppResult<Option<Event>> {
        self.events.find_by_id(id).await
    }

    async fn list_events(&self) -> AppResult<Vec<Event>> {
        self.events.find_all().await
    }

    async fn reserve(
        &self,
        event_id: EventId,
        user_id: UserId,
        seat_count: i32,
        booking_code: String,
        now: DateTime<Utc>,
    ) -> AppResult<Booking> {
        self.bookings
            .reserve(event_id, user_id, seat_count, booking_code, now)
            .await
    }

    async fn confirm_pending(&self, booking_code: &str, now: DateTime<Utc>) -> AppResult<Booking> {
        self.bookings.confirm_pending(booking_code, now).await
    }

    async fn release(
        &self,
        booking_id: BookingId,
        guard: ReleaseGuard,
        now: DateTime<Utc>,
    ) -> AppResult<(Booking, ReleaseOutcome)> {
        self.bookings.release(booking_id, guard, now).await
    }

    async fn find_booking(&self, id: BookingId) -> AppResult<Option<Booking>> {
        self.bookings.find_by_id(id).await
    }

    async fn find_booking_by_code(&self, booking_code: &str) -> AppResult<Option<Booking>> {
        self.bookings.find_by_code(booking_code).await
    }

    async fn find_expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Booking>> {
        self.bookings.find_expired_pending(now, limit).await
    }

    async fn health_check(&self) -> AppResult<()> {
        self.db.health_check().await
    }
}
