//! Event CRUD operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use eventbook_core::error::AppError;
use eventbook_core::result::AppResult;
use eventbook_core::traits::Clock;
use eventbook_core::types::{EventId, ReservationLifespan};
use eventbook_entity::event::{CreateEvent, Event};
use eventbook_reservation::InventoryLedger;

use crate::context::RequestContext;

/// Request to create a new event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    /// Display name.
    pub name: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Price per seat in minor currency units.
    pub cost_cents: i64,
    /// Seat capacity.
    pub total_seats: i32,
    /// Reservation window as a duration string, e.g. `15m` or `1h30m`.
    pub life_span: String,
}

/// Creates and looks up events.
#[derive(Debug, Clone)]
pub struct EventService {
    ledger: Arc<dyn InventoryLedger>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Creates a new event service.
    pub fn new(ledger: Arc<dyn InventoryLedger>, clock: Arc<dyn Clock>) -> Self {
        Self { ledger, clock }
    }

    /// Creates an event organized by the caller with all seats available.
    pub async fn create_event(
        &self,
        ctx: &RequestContext,
        req: CreateEventRequest,
    ) -> AppResult<Event> {
        let organizer = ctx.require_user(self.ledger.as_ref()).await?;
        let lifespan = ReservationLifespan::parse(&req.life_span)?;

        let input = CreateEvent {
            name: req.name.trim().to_string(),
            date: req.date,
            cost_cents: req.cost_cents,
            total_seats: req.total_seats,
            lifespan,
            created_by: organizer.id,
        };
        input.validate()?;

        let event = self
            .ledger
            .insert_event(Event::from_create(input, self.clock.now()))
            .await?;

        info!(
            event_id = %event.id,
            created_by = %event.created_by,
            total_seats = event.total_seats,
            lifespan = %lifespan,
            "Event created"
        );
        Ok(event)
    }

    /// Gets an event by ID.
    pub async fn get_event(&self, event_id: EventId) -> AppResult<Event> {
        self.ledger
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::event_not_found(event_id))
    }

    /// Lists all events, newest first.
    pub async fn list_events(&self) -> AppResult<Vec<Event>> {
        self.ledger.list_events().await
    }
}
