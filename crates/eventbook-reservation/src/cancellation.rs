//! Booking cancellation and seat release.

use std::sync::Arc;

use tracing::{debug, info};

use eventbook_core::result::AppResult;
use eventbook_core::traits::Clock;
use eventbook_core::types::BookingId;
use eventbook_entity::booking::{Booking, ReleaseGuard, ReleaseOutcome};

use crate::ledger::InventoryLedger;
use crate::retry::RetryPolicy;

/// Cancels bookings and returns their seats to the event.
///
/// Manual cancellation and expiry share this path; they differ only in the
/// [`ReleaseGuard`] checked under the booking lock.
#[derive(Debug, Clone)]
pub struct CancellationHandler {
    ledger: Arc<dyn InventoryLedger>,
    clock: Arc<dyn Clock>,
    retry: RetryPolicy,
}

impl CancellationHandler {
    /// Create a new cancellation handler.
    pub fn new(ledger: Arc<dyn InventoryLedger>, clock: Arc<dyn Clock>, retry: RetryPolicy) -> Self {
        Self {
            ledger,
            clock,
            retry,
        }
    }

    /// Cancel a booking in any state. Idempotent.
    pub async fn cancel(&self, booking_id: BookingId) -> AppResult<()> {
        self.release(booking_id, ReleaseGuard::Any).await.map(|_| ())
    }

    /// Cancel a booking only if it is still pending and its window closed
    /// before the current time.
    pub async fn expire(&self, booking_id: BookingId) -> AppResult<ReleaseOutcome> {
        let now = self.clock.now();
        self.release(booking_id, ReleaseGuard::ExpiredBefore(now))
            .await
            .map(|(_, outcome)| outcome)
    }

    /// Release under `guard` and report what happened.
    pub async fn release(
        &self,
        booking_id: BookingId,
        guard: ReleaseGuard,
    ) -> AppResult<(Booking, ReleaseOutcome)> {
        let (booking, outcome) = self
            .retry
            .run("release", move || {
                self.ledger.release(booking_id, guard, self.clock.now())
            })
            .await?;

        match outcome {
            ReleaseOutcome::Released { seats } => info!(
                booking_id = %booking_id,
                event_id = %booking.event_id,
                seats,
                "Booking cancelled and seats released"
            ),
            _ => debug!(booking_id = %booking_id, ?outcome, "Booking left unchanged"),
        }
        Ok((booking, outcome))
    }
}
