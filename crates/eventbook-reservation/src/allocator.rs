//! Reservation allocation.

use std::sync::Arc;

use tracing::{debug, info};

use eventbook_core::error::AppError;
use eventbook_core::result::AppResult;
use eventbook_core::traits::Clock;
use eventbook_core::types::{EventId, UserId};
use eventbook_entity::booking::Booking;

use crate::code::{BookingCodeGenerator, UuidCodeGenerator};
use crate::ledger::InventoryLedger;
use crate::retry::RetryPolicy;

/// Creates pending bookings by atomically taking seats from an event.
#[derive(Debug, Clone)]
pub struct ReservationAllocator {
    ledger: Arc<dyn InventoryLedger>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
    codes: Arc<dyn BookingCodeGenerator>,
}

impl ReservationAllocator {
    /// Create an allocator issuing UUID booking codes.
    pub fn new(ledger: Arc<dyn InventoryLedger>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            ledger,
            clock,
            retry,
            codes: Arc::new(UuidCodeGenerator),
        }
    }

    /// Replace the booking code source.
    pub fn with_code_generator(mut self, codes: Arc<dyn BookingCodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    /// Reserve `seat_count` seats on `event_id` for `user_id`.
    ///
    /// Fails with `EventNotFound`, `SelfBookingForbidden` or
    /// `InsufficientSeats` without touching inventory. A code collision is
    /// retried with a fresh code.
    pub async fn allocate(
        &self,
        event_id: EventId,
        user_id: UserId,
        seat_count: i32,
    ) -> AppResult<Booking> {
        if seat_count < 1 {
            return Err(AppError::validation("Seat count must be at least 1"));
        }

        let result = self
            .retry
            .run("allocate", move || {
                let code = self.codes.generate();
                let now = self.clock.now();
                self.ledger.reserve(event_id, user_id, seat_count, code, now)
            })
            .await;

        match result {
            Ok(booking) => {
                info!(
                    event_id = %event_id,
                    booking_id = %booking.id,
                    seats = seat_count,
                    expires_at = %booking.expires_at,
                    "Seats reserved"
                );
                Ok(booking)
            }
            Err(e) => {
                debug!(event_id = %event_id, seats = seat_count, error = %e, "Reservation rejected");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{TimeDelta, Utc};
    use eventbook_core::ErrorKind;
    use eventbook_core::traits::ManualClock;
    use eventbook_core::types::ReservationLifespan;
    use eventbook_entity::booking::BookingStatus;
    use eventbook_entity::event::{CreateEvent, Event};
    use futures::future::join_all;

    use super::*;
    use crate::memory::MemoryLedger;

    #[derive(Debug)]
    struct ScriptedCodes(Mutex<Vec<String>>);

    impl BookingCodeGenerator for ScriptedCodes {
        fn generate(&self) -> String {
            self.0.lock().unwrap().remove(0)
        }
    }

    async fn setup(total_seats: i32) -> (MemoryLedger, ReservationAllocator, Event, ManualClock) {
        let ledger = MemoryLedger::new();
        let clock = ManualClock::new(Utc::now());
        let event = Event::from_create(
            CreateEvent {
                name: "Concert".to_string(),
                date: clock.now() + TimeDelta::days(30),
                cost_cents: 4500,
                total_seats,
                lifespan: ReservationLifespan::from_minutes(1).unwrap(),
                created_by: UserId::new(),
            },
            clock.now(),
        );
        let event = ledger.insert_event(event).await.unwrap();
        let allocator = ReservationAllocator::new(
            Arc::new(ledger.clone()),
            Arc::new(clock.clone()),
            RetryPolicy::disabled(),
        );
        (ledger, allocator, event, clock)
    }

    #[tokio::test]
    async fn test_allocate_sets_expiry_from_lifespan() {
        let (_, allocator, event, clock) = setup(10).await;
        let booking = allocator.allocate(event.id, UserId::new(), 3).await.unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.seat_count, 3);
        assert_eq!(booking.created_at, clock.now());
        assert_eq!(booking.expires_at, clock.now() + TimeDelta::minutes(1));
        assert!(!booking.booking_code.is_empty());
    }

    #[tokio::test]
    async fn test_zero_seats_rejected_before_ledger() {
        let (ledger, allocator, event, _) = setup(10).await;
        let err = allocator.allocate(event.id, UserId::new(), 0).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 10);
    }

    #[tokio::test]
    async fn test_sold_out_event_rejects_one_more_seat() {
        let (ledger, allocator, event, _) = setup(10).await;
        allocator.allocate(event.id, UserId::new(), 10).await.unwrap();
        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 0);

        let err = allocator.allocate(event.id, UserId::new(), 1).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientSeats);
        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 0);
    }

    #[tokio::test]
    async fn test_code_collision_retries_with_fresh_code() {
        let (ledger, allocator, event, _) = setup(10).await;
        let codes = Arc::new(ScriptedCodes(Mutex::new(vec![
            "dup".to_string(),
            "dup".to_string(),
            "fresh".to_string(),
        ])));
        let allocator = ReservationAllocator {
            retry: RetryPolicy::new(eventbook_core::config::retry::RetryConfig {
                max_attempts: 3,
                initial_backoff_ms: 1,
                max_backoff_ms: 1,
            }),
            ..allocator
        }
        .with_code_generator(codes);

        let first = allocator.allocate(event.id, UserId::new(), 1).await.unwrap();
        let second = allocator.allocate(event.id, UserId::new(), 1).await.unwrap();

        assert_eq!(first.booking_code, "dup");
        assert_eq!(second.booking_code, "fresh");
        let audit = ledger.audit(event.id).await.unwrap();
        assert_eq!(audit.available_seats, 8);
        assert!(audit.is_balanced());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_simultaneous_six_seat_bookings() {
        let (ledger, allocator, event, _) = setup(10).await;

        let attempts = (0..2).map(|_| {
            let allocator = allocator.clone();
            tokio::spawn(async move { allocator.allocate(event.id, UserId::new(), 6).await })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let granted = results.iter().filter(|r| r.is_ok()).count();
        let rejected: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(granted, 1);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].kind, ErrorKind::InsufficientSeats);
        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_allocations_never_oversell() {
        let (ledger, allocator, event, _) = setup(50).await;

        let attempts = (0..40).map(|i| {
            let allocator = allocator.clone();
            let seats = (i % 3) + 1;
            tokio::spawn(async move { (seats, allocator.allocate(event.id, UserId::new(), seats).await) })
        });
        let results: Vec<_> = join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let granted: i32 = results
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(seats, _)| *seats)
            .sum();
        for (_, result) in &results {
            if let Err(e) = result {
                assert_eq!(e.kind, ErrorKind::InsufficientSeats);
            }
        }

        let audit = ledger.audit(event.id).await.unwrap();
        assert!(granted <= 50);
        assert_eq!(audit.available_seats, 50 - granted);
        assert!(audit.is_balanced());
        // Availability only shrinks here, so it ends below any rejected request.
        assert!(audit.available_seats < 3);
    }
}
