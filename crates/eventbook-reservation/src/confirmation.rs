//! Booking confirmation.

use std::sync::Arc;

use tracing::info;

use eventbook_core::result::AppResult;
use eventbook_core::traits::Clock;
use eventbook_entity::booking::Booking;

use crate::ledger::InventoryLedger;
use crate::retry::RetryPolicy;

/// Promotes pending bookings to confirmed. Seat counts are not touched.
#[derive(Debug, Clone)]
pub struct ConfirmationHandler {
    ledger: Arc<dyn InventoryLedger>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl ConfirmationHandler {
    /// Create a new confirmation handler.
    pub fn new(ledger: Arc<dyn InventoryLedger>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            ledger,
            clock,
            retry,
        }
    }

    /// Confirm the pending booking identified by `booking_code`.
    ///
    /// A code that is blank, unknown, already confirmed or cancelled yields
    /// `BookingNotFound`.
    pub async fn confirm(&self, booking_code: &str) -> AppResult<Booking> {
        let booking_code = booking_code.trim();

        let booking = self
            .retry
            .run("confirm", move || {
                self.ledger.confirm_pending(booking_code, self.clock.now())
            })
            .await?;

        info!(
            booking_id = %booking.id,
            event_id = %booking.event_id,
            seats = booking.seat_count,
            "Booking confirmed"
        );
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use eventbook_core::ErrorKind;
    use eventbook_core::traits::ManualClock;
    use eventbook_core::types::{ReservationLifespan, UserId};
    use eventbook_entity::booking::BookingStatus;
    use eventbook_entity::event::{CreateEvent, Event};

    use super::*;
    use crate::allocator::ReservationAllocator;
    use crate::memory::MemoryLedger;

    async fn setup() -> (MemoryLedger, ReservationAllocator, ConfirmationHandler, Event, ManualClock) {
        let ledger = MemoryLedger::new();
        let clock = ManualClock::new(Utc::now());
        let event = ledger
            .insert_event(Event::from_create(
                CreateEvent {
                    name: "Workshop".to_string(),
                    date: clock.now(),
                    cost_cents: 0,
                    total_seats: 5,
                    lifespan: ReservationLifespan::from_minutes(10).unwrap(),
                    created_by: UserId::new(),
                },
                clock.now(),
            ))
            .await
            .unwrap();
        let shared: Arc<dyn InventoryLedger> = Arc::new(ledger.clone());
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let allocator =
            ReservationAllocator::new(shared.clone(), shared_clock.clone(), RetryPolicy::disabled());
        let confirmation = ConfirmationHandler::new(shared, shared_clock, RetryPolicy::disabled());
        (ledger, allocator, confirmation, event, clock)
    }

    #[tokio::test]
    async fn test_confirm_keeps_seats_reserved() {
        let (ledger, allocator, confirmation, event, clock) = setup().await;
        let booking = allocator.allocate(event.id, UserId::new(), 2).await.unwrap();

        clock.advance(TimeDelta::minutes(3));
        let confirmed = confirmation.confirm(&booking.booking_code).await.unwrap();

        assert_eq!(confirmed.id, booking.id);
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.confirmed_at, Some(clock.now()));
        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 3);
    }

    #[tokio::test]
    async fn test_second_confirmation_reports_not_found() {
        let (_, allocator, confirmation, event, _) = setup().await;
        let booking = allocator.allocate(event.id, UserId::new(), 1).await.unwrap();

        confirmation.confirm(&booking.booking_code).await.unwrap();
        let err = confirmation.confirm(&booking.booking_code).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BookingNotFound);
    }

    #[tokio::test]
    async fn test_blank_code_matches_no_booking() {
        let (ledger, allocator, confirmation, event, _) = setup().await;
        allocator.allocate(event.id, UserId::new(), 1).await.unwrap();

        for code in ["", "   "] {
            let err = confirmation.confirm(code).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::BookingNotFound);
        }
        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 4);
    }
}
