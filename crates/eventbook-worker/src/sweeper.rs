//! Expiry sweeper: periodically cancels pending bookings whose reservation
//! window has closed and returns their seats.
//!
//! Every booking is released in its own transaction through
//! [`CancellationHandler::expire`], which re-checks `pending` and the
//! deadline under the booking lock. A booking confirmed after the scan is
//! therefore left alone.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use eventbook_core::config::sweeper::SweeperConfig;
use eventbook_core::error::AppError;
use eventbook_core::result::AppResult;
use eventbook_core::traits::Clock;
use eventbook_entity::booking::ReleaseOutcome;
use eventbook_reservation::{CancellationHandler, InventoryLedger};

/// Where the sweeper is within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperPhase {
    /// Waiting for the next tick.
    Idle,
    /// Querying for expired pending bookings.
    Scanning,
    /// Releasing the bookings found by the last scan.
    Releasing,
}

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired pending bookings returned by scans.
    pub scanned: usize,
    /// Bookings cancelled by this sweep.
    pub released: usize,
    /// Seats returned to events.
    pub seats_released: i64,
    /// Bookings found already cancelled under the lock.
    pub already_cancelled: usize,
    /// Bookings that no longer qualified under the lock (e.g. confirmed).
    pub skipped: usize,
    /// Bookings whose release failed; they are retried next tick.
    pub failed: usize,
    /// The scan query itself failed.
    pub scan_failed: bool,
    /// Shutdown was requested before every scanned booking was handled.
    pub interrupted: bool,
}

/// Owned background component that cancels expired pending bookings.
#[derive(Debug)]
pub struct ExpirySweeper {
    ledger: Arc<dyn InventoryLedger>,
    cancellation: CancellationHandler,
    clock: Arc<dyn Clock>,
    config: SweeperConfig,
    phase: watch::Sender<SweeperPhase>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ExpirySweeper {
    /// Create a sweeper. Nothing runs until [`ExpirySweeper::start`].
    pub fn new(
        ledger: Arc<dyn InventoryLedger>,
        cancellation: CancellationHandler,
        clock: Arc<dyn Clock>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            ledger,
            cancellation,
            clock,
            config,
            phase: watch::Sender::new(SweeperPhase::Idle),
            stop: watch::Sender::new(false),
            task: Mutex::new(None),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SweeperPhase {
        *self.phase.borrow()
    }

    /// Follow phase changes.
    pub fn subscribe_phase(&self) -> watch::Receiver<SweeperPhase> {
        self.phase.subscribe()
    }

    /// Whether the background task is alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the periodic loop. The first sweep runs immediately.
    ///
    /// The loop ends when `shutdown` becomes `true` (or its sender is
    /// dropped) or when [`ExpirySweeper::stop`] is called.
    pub fn start(self: &Arc<Self>, shutdown: watch::Receiver<bool>) -> AppResult<()> {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(AppError::internal("Expiry sweeper is already running"));
        }

        self.stop.send_replace(false);
        let stop = self.stop.subscribe();
        let sweeper = Arc::clone(self);
        *task = Some(tokio::spawn(async move { sweeper.run(shutdown, stop).await }));
        Ok(())
    }

    /// Stop launching ticks and wait for the current one to reach a
    /// booking boundary.
    pub async fn stop(&self) {
        self.stop.send_replace(true);
        let handle = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(mut handle) = handle else {
            return;
        };
        match time::timeout(self.config.shutdown_timeout(), &mut handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Expiry sweeper task failed"),
            Err(_) => {
                warn!(
                    timeout_seconds = self.config.shutdown_timeout_seconds,
                    "Expiry sweeper did not stop in time, aborting"
                );
                handle.abort();
            }
        }
    }

    /// Run a single sweep now, to completion.
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep(|| false).await
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>, mut stop: watch::Receiver<bool>) {
        info!(
            interval_seconds = self.config.interval_seconds,
            batch_size = self.config.batch_size,
            "Expiry sweeper started"
        );

        let mut ticker = time::interval(self.config.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = signalled(&mut shutdown) => {
                    info!("Expiry sweeper received shutdown signal");
                    break;
                }
                _ = signalled(&mut stop) => {
                    info!("Expiry sweeper stop requested");
                    break;
                }
                _ = ticker.tick() => {
                    let report = self.sweep(|| *shutdown.borrow() || *stop.borrow()).await;
                    if report.interrupted {
                        break;
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    }

    async fn sweep(&self, interrupted: impl Fn() -> bool + Send) -> SweepReport {
        let mut report = SweepReport::default();

        'scan: loop {
            self.phase.send_replace(SweeperPhase::Scanning);
            let now = self.clock.now();
            let batch = match self
                .ledger
                .find_expired_pending(now, self.config.batch_size)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Failed to scan for expired bookings");
                    report.scan_failed = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            report.scanned += batch.len();
            let failed_before = report.failed;
            self.phase.send_replace(SweeperPhase::Releasing);

            for booking in &batch {
                if interrupted() {
                    report.interrupted = true;
                    break 'scan;
                }

                match self.cancellation.expire(booking.id).await {
                    Ok(ReleaseOutcome::Released { seats }) => {
                        report.released += 1;
                        report.seats_released += i64::from(seats);
                    }
                    Ok(ReleaseOutcome::AlreadyCancelled) => report.already_cancelled += 1,
                    Ok(ReleaseOutcome::Skipped { status }) => {
                        debug!(booking_id = %booking.id, %status, "Booking no longer expirable");
                        report.skipped += 1;
                    }
                    Err(e) => {
                        error!(
                            booking_id = %booking.id,
                            event_id = %booking.event_id,
                            error = %e,
                            "Failed to release expired booking"
                        );
                        report.failed += 1;
                    }
                }
            }

            // A short batch drained the backlog; a failing one would be
            // returned again by the next scan.
            let full_batch = i64::try_from(batch.len()).unwrap_or(i64::MAX) >= self.config.batch_size;
            if !full_batch || report.failed > failed_before {
                break;
            }
        }

        self.phase.send_replace(SweeperPhase::Idle);

        if report.scanned == 0 && !report.scan_failed {
            debug!("No expired bookings");
        } else {
            info!(
                scanned = report.scanned,
                released = report.released,
                seats_released = report.seats_released,
                already_cancelled = report.already_cancelled,
                skipped = report.skipped,
                failed = report.failed,
                interrupted = report.interrupted,
                "Expiry sweep completed"
            );
        }
        report
    }
}

/// Resolves once the flag is `true` or its sender is gone.
async fn signalled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|flag| *flag).await;
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeDelta, Utc};
    use eventbook_core::traits::ManualClock;
    use eventbook_core::types::{BookingId, EventId, ReservationLifespan, UserId};
    use eventbook_entity::booking::{Booking, BookingStatus, ReleaseGuard};
    use eventbook_entity::event::{CreateEvent, Event};
    use eventbook_entity::user::User;
    use eventbook_reservation::{
        ConfirmationHandler, MemoryLedger, ReservationAllocator, RetryPolicy,
    };

    use super::*;

    /// Delegates to a memory ledger but fails releases of chosen bookings.
    #[derive(Debug)]
    struct FlakyLedger {
        inner: MemoryLedger,
        failing: std::sync::Mutex<HashSet<BookingId>>,
    }

    #[async_trait]
    impl InventoryLedger for FlakyLedger {
        async fn find_user(&self, id: UserId) -> AppResult<Option<User>> {
            self.inner.find_user(id).await
        }

        async fn insert_event(&self, event: Event) -> AppResult<Event> {
            self.inner.insert_event(event).await
        }

        async fn find_event(&self, id: EventId) -> AppResult<Option<Event>> {
            self.inner.find_event(id).await
        }

        async fn list_events(&self) -> AppResult<Vec<Event>> {
            self.inner.list_events().await
        }

        async fn reserve(
            &self,
            event_id: EventId,
            user_id: UserId,
            seat_count: i32,
            booking_code: String,
            now: DateTime<Utc>,
        ) -> AppResult<Booking> {
            self.inner
                .reserve(event_id, user_id, seat_count, booking_code, now)
                .await
        }

        async fn confirm_pending(
            &self,
            booking_code: &str,
            now: DateTime<Utc>,
        ) -> AppResult<Booking> {
            self.inner.confirm_pending(booking_code, now).await
        }

        async fn release(
            &self,
            booking_id: BookingId,
            guard: ReleaseGuard,
            now: DateTime<Utc>,
        ) -> AppResult<(Booking, ReleaseOutcome)> {
            if self.failing.lock().unwrap().contains(&booking_id) {
                return Err(AppError::database("simulated write failure"));
            }
            self.inner.release(booking_id, guard, now).await
        }

        async fn find_booking(&self, id: BookingId) -> AppResult<Option<Booking>> {
            self.inner.find_booking(id).await
        }

        async fn find_booking_by_code(&self, booking_code: &str) -> AppResult<Option<Booking>> {
            self.inner.find_booking_by_code(booking_code).await
        }

        async fn find_expired_pending(
            &self,
            now: DateTime<Utc>,
            limit: i64,
        ) -> AppResult<Vec<Booking>> {
            self.inner.find_expired_pending(now, limit).await
        }

        async fn health_check(&self) -> AppResult<()> {
            Ok(())
        }
    }

    struct Fixture {
        memory: MemoryLedger,
        ledger: Arc<dyn InventoryLedger>,
        clock: ManualClock,
        allocator: ReservationAllocator,
        confirmation: ConfirmationHandler,
        cancellation: CancellationHandler,
        sweeper: Arc<ExpirySweeper>,
        event: Event,
    }

    fn sweeper_config(batch_size: i64) -> SweeperConfig {
        SweeperConfig {
            enabled: true,
            interval_seconds: 60,
            batch_size,
            shutdown_timeout_seconds: 5,
        }
    }

    async fn fixture_with(
        memory: MemoryLedger,
        ledger: Arc<dyn InventoryLedger>,
        total_seats: i32,
        batch_size: i64,
    ) -> Fixture {
        let clock = ManualClock::new(Utc::now());
        let event = ledger
            .insert_event(Event::from_create(
                CreateEvent {
                    name: "Festival".to_string(),
                    date: clock.now() + TimeDelta::days(10),
                    cost_cents: 999,
                    total_seats,
                    lifespan: ReservationLifespan::from_minutes(1).unwrap(),
                    created_by: UserId::new(),
                },
                clock.now(),
            ))
            .await
            .unwrap();
        let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let cancellation =
            CancellationHandler::new(ledger.clone(), shared_clock.clone(), RetryPolicy::disabled());
        let sweeper = Arc::new(ExpirySweeper::new(
            ledger.clone(),
            cancellation.clone(),
            shared_clock.clone(),
            sweeper_config(batch_size),
        ));
        Fixture {
            allocator: ReservationAllocator::new(
                ledger.clone(),
                shared_clock.clone(),
                RetryPolicy::disabled(),
            ),
            confirmation: ConfirmationHandler::new(
                ledger.clone(),
                shared_clock,
                RetryPolicy::disabled(),
            ),
            cancellation,
            memory,
            ledger,
            clock,
            sweeper,
            event,
        }
    }

    async fn fixture(total_seats: i32) -> Fixture {
        let memory = MemoryLedger::new();
        fixture_with(memory.clone(), Arc::new(memory), total_seats, 500).await
    }

    async fn status_of(f: &Fixture, id: BookingId) -> BookingStatus {
        f.ledger.find_booking(id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_expired_booking_released_after_lifespan() {
        let f = fixture(10).await;
        let booking = f.allocator.allocate(f.event.id, UserId::new(), 3).await.unwrap();
        assert_eq!(f.memory.audit(f.event.id).await.unwrap().available_seats, 7);

        f.clock.advance(TimeDelta::seconds(61));
        let report = f.sweeper.sweep_once().await;

        assert_eq!(report.released, 1);
        assert_eq!(report.seats_released, 3);
        assert_eq!(status_of(&f, booking.id).await, BookingStatus::Cancelled);
        let audit = f.memory.audit(f.event.id).await.unwrap();
        assert_eq!(audit.available_seats, 10);
        assert!(audit.is_balanced());
        assert_eq!(f.sweeper.phase(), SweeperPhase::Idle);
    }

    #[tokio::test]
    async fn test_booking_not_released_before_deadline() {
        let f = fixture(10).await;
        let booking = f.allocator.allocate(f.event.id, UserId::new(), 2).await.unwrap();

        f.clock.advance(TimeDelta::seconds(60));
        let report = f.sweeper.sweep_once().await;

        assert_eq!(report, SweepReport::default());
        assert_eq!(status_of(&f, booking.id).await, BookingStatus::Pending);
        assert_eq!(f.memory.audit(f.event.id).await.unwrap().available_seats, 8);
    }

    #[tokio::test]
    async fn test_confirmed_booking_survives_repeated_sweeps() {
        let f = fixture(10).await;
        let booking = f.allocator.allocate(f.event.id, UserId::new(), 2).await.unwrap();
        f.confirmation.confirm(&booking.booking_code).await.unwrap();

        for _ in 0..10 {
            f.clock.advance(TimeDelta::minutes(1));
            let report = f.sweeper.sweep_once().await;
            assert_eq!(report.released, 0);
        }

        assert_eq!(status_of(&f, booking.id).await, BookingStatus::Confirmed);
        assert_eq!(f.memory.audit(f.event.id).await.unwrap().available_seats, 8);
    }

    #[tokio::test]
    async fn test_failed_release_does_not_abort_sweep() {
        let memory = MemoryLedger::new();
        let flaky = Arc::new(FlakyLedger {
            inner: memory.clone(),
            failing: std::sync::Mutex::new(HashSet::new()),
        });
        let f = fixture_with(memory, flaky.clone(), 10, 500).await;

        let broken = f.allocator.allocate(f.event.id, UserId::new(), 1).await.unwrap();
        let healthy = f.allocator.allocate(f.event.id, UserId::new(), 2).await.unwrap();
        flaky.failing.lock().unwrap().insert(broken.id);

        f.clock.advance(TimeDelta::minutes(2));
        let report = f.sweeper.sweep_once().await;

        assert_eq!(report.scanned, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.released, 1);
        assert_eq!(status_of(&f, healthy.id).await, BookingStatus::Cancelled);
        assert_eq!(status_of(&f, broken.id).await, BookingStatus::Pending);

        flaky.failing.lock().unwrap().clear();
        let report = f.sweeper.sweep_once().await;
        assert_eq!(report.released, 1);
        assert_eq!(f.memory.audit(f.event.id).await.unwrap().available_seats, 10);
    }

    #[tokio::test]
    async fn test_backlog_larger_than_batch_is_drained() {
        let memory = MemoryLedger::new();
        let f = fixture_with(memory.clone(), Arc::new(memory), 20, 3).await;
        for _ in 0..7 {
            f.allocator.allocate(f.event.id, UserId::new(), 1).await.unwrap();
        }

        f.clock.advance(TimeDelta::minutes(5));
        let report = f.sweeper.sweep_once().await;

        assert_eq!(report.released, 7);
        assert_eq!(f.memory.audit(f.event.id).await.unwrap().available_seats, 20);
    }

    #[tokio::test]
    async fn test_interrupt_stops_between_bookings() {
        let f = fixture(10).await;
        for _ in 0..3 {
            f.allocator.allocate(f.event.id, UserId::new(), 1).await.unwrap();
        }
        f.clock.advance(TimeDelta::minutes(2));

        let checks = AtomicUsize::new(0);
        let report = f
            .sweeper
            .sweep(|| checks.fetch_add(1, Ordering::SeqCst) >= 1)
            .await;

        assert!(report.interrupted);
        assert_eq!(report.released, 1);
        let audit = f.memory.audit(f.event.id).await.unwrap();
        assert_eq!(audit.available_seats, 8);
        assert!(audit.is_balanced());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_cancel_and_sweep_release_once() {
        let f = fixture(5).await;
        let booking = f.allocator.allocate(f.event.id, UserId::new(), 5).await.unwrap();
        f.clock.advance(TimeDelta::minutes(2));

        let cancellation = f.cancellation.clone();
        let sweeper = f.sweeper.clone();
        let (cancelled, report) = tokio::join!(
            tokio::spawn(async move { cancellation.cancel(booking.id).await }),
            tokio::spawn(async move { sweeper.sweep_once().await }),
        );
        cancelled.unwrap().unwrap();
        let report = report.unwrap();

        assert!(report.released <= 1);
        let audit = f.memory.audit(f.event.id).await.unwrap();
        assert_eq!(audit.available_seats, 5);
        assert!(audit.is_balanced());
        assert_eq!(status_of(&f, booking.id).await, BookingStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_runs_ticks_until_stopped() {
        let f = fixture(10).await;
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let first = f.allocator.allocate(f.event.id, UserId::new(), 4).await.unwrap();
        f.clock.advance(TimeDelta::seconds(61));

        f.sweeper.start(shutdown_rx.clone()).unwrap();
        assert!(f.sweeper.start(shutdown_rx).is_err());

        // The first tick fires immediately.
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status_of(&f, first.id).await, BookingStatus::Cancelled);

        let second = f.allocator.allocate(f.event.id, UserId::new(), 2).await.unwrap();
        f.clock.advance(TimeDelta::seconds(61));
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(status_of(&f, second.id).await, BookingStatus::Cancelled);

        f.sweeper.stop().await;
        assert!(!f.sweeper.is_running());
        assert_eq!(f.memory.audit(f.event.id).await.unwrap().available_seats, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_signal_ends_loop() {
        let f = fixture(10).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        f.sweeper.start(shutdown_rx).unwrap();
        time::sleep(Duration::from_millis(10)).await;
        assert!(f.sweeper.is_running());

        shutdown_tx.send(true).unwrap();
        time::sleep(Duration::from_millis(10)).await;
        assert!(!f.sweeper.is_running());

        f.sweeper.stop().await;
    }
}
