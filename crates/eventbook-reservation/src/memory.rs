//! In-process ledger using Tokio locks, for tests and single-node runs.
//!
//! Each event and its bookings form one partition behind a
//! `tokio::sync::Mutex`; holding it is the equivalent of holding the event
//! row lock and the locks of all its booking rows. The catalog maps codes
//! and booking IDs to partitions and is never held while waiting for a
//! partition.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use eventbook_core::error::AppError;
use eventbook_core::result::AppResult;
use eventbook_core::types::{BookingId, EventId, UserId};
use eventbook_entity::booking::{
    Booking, BookingStatus, NewBooking, ReleaseGuard, ReleaseOutcome,
};
use eventbook_entity::event::Event;
use eventbook_entity::user::User;

use crate::ledger::InventoryLedger;

/// An event together with every booking made against it.
#[derive(Debug)]
struct Partition {
    event: Event,
    bookings: HashMap<BookingId, Booking>,
}

impl Partition {
    fn held_seats(&self) -> i32 {
        self.bookings
            .values()
            .filter(|b| b.status.holds_seats())
            .map(|b| b.seat_count)
            .sum()
    }
}

#[derive(Debug, Default)]
struct Catalog {
    users: HashMap<UserId, User>,
    partitions: HashMap<EventId, Arc<Mutex<Partition>>>,
    booking_events: HashMap<BookingId, EventId>,
    codes: HashMap<String, BookingId>,
}

/// Consistent snapshot of one event's inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InventoryAudit {
    /// Seat capacity.
    pub total_seats: i32,
    /// Seats the event row reports as free.
    pub available_seats: i32,
    /// Seats held by pending and confirmed bookings.
    pub held_seats: i32,
}

impl InventoryAudit {
    /// `available + held == total` and `0 <= available <= total`.
    pub fn is_balanced(&self) -> bool {
        self.available_seats + self.held_seats == self.total_seats
            && (0..=self.total_seats).contains(&self.available_seats)
    }
}

/// Ledger kept entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    catalog: Arc<RwLock<Catalog>>,
}

impl MemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account, as the identity service would.
    pub async fn insert_user(&self, user: User) {
        self.catalog.write().await.users.insert(user.id, user);
    }

    /// Snapshot an event's inventory under its partition lock.
    pub async fn audit(&self, event_id: EventId) -> Option<InventoryAudit> {
        let partition = self.partition(event_id).await?;
        let partition = partition.lock().await;
        Some(InventoryAudit {
            total_seats: partition.event.total_seats,
            available_seats: partition.event.available_seats,
            held_seats: partition.held_seats(),
        })
    }

    async fn partition(&self, event_id: EventId) -> Option<Arc<Mutex<Partition>>> {
        self.catalog.read().await.partitions.get(&event_id).cloned()
    }

    async fn partition_of(&self, booking_id: BookingId) -> Option<Arc<Mutex<Partition>>> {
        let catalog = self.catalog.read().await;
        let event_id = catalog.booking_events.get(&booking_id)?;
        catalog.partitions.get(event_id).cloned()
    }

    async fn all_partitions(&self) -> Vec<Arc<Mutex<Partition>>> {
        self.catalog.read().await.partitions.values().cloned().collect()
    }
}

#[async_trait]
impl InventoryLedger for MemoryLedger {
    async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
        Ok(self.catalog.read().await.users.get(&id).cloned())
    }

    async fn insert_event(&self, event: Event) -> AppResult<Event> {
        let mut catalog = self.catalog.write().await;
        if catalog.partitions.contains_key(&event.id) {
            return Err(AppError::conflict(format!("Event {} already exists", event.id)));
        }
        catalog.partitions.insert(
            event.id,
            Arc::new(Mutex::new(Partition {
                event: event.clone(),
                bookings: HashMap::new(),
            })),
        );
        Ok(event)
    }

    async fn find_event(&self, id: EventId) -> AppResult<Option<Event>> {
        match self.partition(id).await {
            Some(partition) => Ok(Some(partition.lock().await.event.clone())),
            None => Ok(None),
        }
    }

    async fn list_events(&self) -> AppResult<Vec<Event>> {
        let mut events = Vec::new();
        for partition in self.all_partitions().await {
            events.push(partition.lock().await.event.clone());
        }
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn reserve(
        &self,
        event_id: EventId,
        user_id: UserId,
        seat_count: i32,
        booking_code: String,
        now: DateTime<Utc>,
    ) -> AppResult<Booking> {
        let partition = self
            .partition(event_id)
            .await
            .ok_or_else(|| AppError::event_not_found(event_id))?;
        let mut partition = partition.lock().await;

        partition.event.check_reservation(user_id, seat_count)?;

        let booking =
            NewBooking::for_event(&partition.event, user_id, seat_count, booking_code, now)
                .into_booking();
        {
            let mut catalog = self.catalog.write().await;
            if catalog.codes.contains_key(&booking.booking_code) {
                return Err(AppError::conflict("Booking code already in use"));
            }
            catalog
                .codes
                .insert(booking.booking_code.clone(), booking.id);
            catalog.booking_events.insert(booking.id, event_id);
        }

        partition.event.available_seats -= seat_count;
        partition.event.updated_at = now;
        partition.bookings.insert(booking.id, booking.clone());

        debug!(
            event_id = %event_id,
            booking_id = %booking.id,
            available = partition.event.available_seats,
            "Memory ledger reserved seats"
        );
        Ok(booking)
    }

    async fn confirm_pending(&self, booking_code: &str, now: DateTime<Utc>) -> AppResult<Booking> {
        let not_found =
            || AppError::booking_not_found(format!("No pending booking with code {booking_code}"));

        let booking_id = self
            .catalog
            .read()
            .await
            .codes
            .get(booking_code)
            .copied()
            .ok_or_else(not_found)?;
        let partition = self.partition_of(booking_id).await.ok_or_else(not_found)?;
        let mut partition = partition.lock().await;

        let booking = partition
            .bookings
            .get_mut(&booking_id)
            .filter(|b| b.status == BookingStatus::Pending)
            .ok_or_else(not_found)?;
        booking.status = BookingStatus::Confirmed;
        booking.confirmed_at = Some(now);
        Ok(booking.clone())
    }

    async fn release(
        &self,
        booking_id: BookingId,
        guard: ReleaseGuard,
        now: DateTime<Utc>,
    ) -> AppResult<(Booking, ReleaseOutcome)> {
        let not_found = || AppError::booking_not_found(format!("Booking {booking_id} not found"));

        let partition = self.partition_of(booking_id).await.ok_or_else(not_found)?;
        let mut partition = partition.lock().await;

        let booking = partition.bookings.get_mut(&booking_id).ok_or_else(not_found)?;
        let outcome = ReleaseOutcome::decide(booking, guard);
        if !outcome.mutates() {
            return Ok((booking.clone(), outcome));
        }

        booking.status = BookingStatus::Cancelled;
        booking.cancelled_at = Some(now);
        let cancelled = booking.clone();

        partition.event.available_seats += outcome.released_seats();
        partition.event.updated_at = now;
        Ok((cancelled, outcome))
    }

    async fn find_booking(&self, id: BookingId) -> AppResult<Option<Booking>> {
        match self.partition_of(id).await {
            Some(partition) => Ok(partition.lock().await.bookings.get(&id).cloned()),
            None => Ok(None),
        }
    }

    async fn find_booking_by_code(&self, booking_code: &str) -> AppResult<Option<Booking>> {
        let booking_id = self.catalog.read().await.codes.get(booking_code).copied();
        match booking_id {
            Some(id) => self.find_booking(id).await,
            None => Ok(None),
        }
    }

    async fn find_expired_pending(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> AppResult<Vec<Booking>> {
        let mut expired = Vec::new();
        for partition in self.all_partitions().await {
            let partition = partition.lock().await;
            expired.extend(
                partition
                    .bookings
                    .values()
                    .filter(|b| b.is_expired_at(now))
                    .cloned(),
            );
        }
        expired.sort_by_key(|b| b.expires_at);
        expired.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(expired)
    }

    async fn health_check(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use eventbook_core::ErrorKind;
    use eventbook_core::types::ReservationLifespan;
    use eventbook_entity::event::CreateEvent;

    use super::*;

    async fn seeded(total_seats: i32) -> (MemoryLedger, Event, DateTime<Utc>) {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        let event = Event::from_create(
            CreateEvent {
                name: "Meetup".to_string(),
                date: now + TimeDelta::days(7),
                cost_cents: 1000,
                total_seats,
                lifespan: ReservationLifespan::from_minutes(1).unwrap(),
                created_by: UserId::new(),
            },
            now,
        );
        let event = ledger.insert_event(event).await.unwrap();
        (ledger, event, now)
    }

    #[tokio::test]
    async fn test_reserve_decrements_and_balances() {
        let (ledger, event, now) = seeded(10).await;
        let booking = ledger
            .reserve(event.id, UserId::new(), 4, "a".to_string(), now)
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        let audit = ledger.audit(event.id).await.unwrap();
        assert_eq!(audit.available_seats, 6);
        assert!(audit.is_balanced());
    }

    #[tokio::test]
    async fn test_reserve_rejections_leave_no_trace() {
        let (ledger, event, now) = seeded(2).await;

        let err = ledger
            .reserve(EventId::new(), UserId::new(), 1, "x".to_string(), now)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::EventNotFound);

        let err = ledger
            .reserve(event.id, event.created_by, 1, "y".to_string(), now)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SelfBookingForbidden);

        let err = ledger
            .reserve(event.id, UserId::new(), 3, "z".to_string(), now)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientSeats);

        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 2);
        assert!(ledger.find_booking_by_code("z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_conflicts_without_mutation() {
        let (ledger, event, now) = seeded(5).await;
        ledger
            .reserve(event.id, UserId::new(), 1, "same".to_string(), now)
            .await
            .unwrap();

        let err = ledger
            .reserve(event.id, UserId::new(), 1, "same".to_string(), now)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 4);
    }

    #[tokio::test]
    async fn test_confirm_only_matches_pending() {
        let (ledger, event, now) = seeded(5).await;
        ledger
            .reserve(event.id, UserId::new(), 2, "code".to_string(), now)
            .await
            .unwrap();

        let confirmed = ledger.confirm_pending("code", now).await.unwrap();
        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.confirmed_at, Some(now));

        let err = ledger.confirm_pending("code", now).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BookingNotFound);

        let err = ledger.confirm_pending("missing", now).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BookingNotFound);
        assert_eq!(ledger.audit(event.id).await.unwrap().available_seats, 3);
    }

    #[tokio::test]
    async fn test_release_returns_seats_once() {
        let (ledger, event, now) = seeded(5).await;
        let booking = ledger
            .reserve(event.id, UserId::new(), 3, "code".to_string(), now)
            .await
            .unwrap();

        let (cancelled, first) = ledger
            .release(booking.id, ReleaseGuard::Any, now)
            .await
            .unwrap();
        assert_eq!(first, ReleaseOutcome::Released { seats: 3 });
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(cancelled.cancelled_at, Some(now));

        let (_, second) = ledger
            .release(booking.id, ReleaseGuard::Any, now)
            .await
            .unwrap();
        assert_eq!(second, ReleaseOutcome::AlreadyCancelled);

        let audit = ledger.audit(event.id).await.unwrap();
        assert_eq!(audit.available_seats, 5);
        assert!(audit.is_balanced());
    }

    #[tokio::test]
    async fn test_release_unknown_booking() {
        let ledger = MemoryLedger::new();
        let err = ledger
            .release(BookingId::new(), ReleaseGuard::Any, Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BookingNotFound);
    }

    #[tokio::test]
    async fn test_find_expired_pending_is_strict_and_ordered() {
        let (ledger, event, now) = seeded(10).await;
        let early = ledger
            .reserve(event.id, UserId::new(), 1, "early".to_string(), now)
            .await
            .unwrap();
        let late = ledger
            .reserve(
                event.id,
                UserId::new(),
                1,
                "late".to_string(),
                now + TimeDelta::seconds(30),
            )
            .await
            .unwrap();
        ledger
            .reserve(event.id, UserId::new(), 1, "kept".to_string(), now)
            .await
            .unwrap();
        ledger.confirm_pending("kept", now).await.unwrap();

        let at_deadline = ledger
            .find_expired_pending(early.expires_at, 100)
            .await
            .unwrap();
        assert!(at_deadline.is_empty());

        let later = now + TimeDelta::minutes(5);
        let expired = ledger.find_expired_pending(later, 100).await.unwrap();
        let ids: Vec<_> = expired.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![early.id, late.id]);

        let limited = ledger.find_expired_pending(later, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_list_events_newest_first() {
        let ledger = MemoryLedger::new();
        let now = Utc::now();
        let mut ids = Vec::new();
        for offset in 0..3 {
            let event = Event::from_create(
                CreateEvent {
                    name: format!("Event {offset}"),
                    date: now,
                    cost_cents: 0,
                    total_seats: 1,
                    lifespan: ReservationLifespan::from_minutes(5).unwrap(),
                    created_by: UserId::new(),
                },
                now + TimeDelta::seconds(offset),
            );
            ids.push(ledger.insert_event(event).await.unwrap().id);
        }

        let listed: Vec<_> = ledger
            .list_events()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        ids.reverse();
        assert_eq!(listed, ids);
    }
}
