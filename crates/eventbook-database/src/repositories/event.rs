//! Event repository implementation.

use sqlx::PgPool;

use eventbook_core::result::AppResult;
use eventbook_core::types::EventId;
use eventbook_entity::event::Event;

use crate::error::classify;

/// Repository for event creation and lookups.
///
/// Seat counts are only changed by [`super::BookingRepository`], inside the
/// transactions that lock the event row.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new event.
    pub async fn create(&self, event: &Event) -> AppResult<Event> {
        sqlx::query_as::<_, Event>(
            "INSERT INTO events (id, name, date, cost_cents, total_seats, available_seats, \
             reservation_lifespan_minutes, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(event.id)
        .bind(&event.name)
        .bind(event.date)
        .bind(event.cost_cents)
        .bind(event.total_seats)
        .bind(event.available_seats)
        .bind(event.reservation_lifespan_minutes)
        .bind(event.created_by)
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("Failed to create event", e))
    }

    /// Find an event by ID.
    pub async fn find_by_id(&self, id: EventId) -> AppResult<Option<Event>> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find event", e))
    }

    /// List all events, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<Event>> {
        sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify("Failed to list events", e))
    }
}
