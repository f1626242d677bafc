//! Booking lifecycle operations: book, confirm, cancel and look up.

use std::sync::Arc;

use tracing::{info, warn};

use eventbook_core::error::AppError;
use eventbook_core::result::AppResult;
use eventbook_core::types::{BookingId, EventId};
use eventbook_entity::booking::{Booking, ReleaseGuard};
use eventbook_reservation::{
    CancellationHandler, ConfirmationHandler, InventoryLedger, ReservationAllocator,
};

use crate::context::RequestContext;

/// Booking use cases on top of the reservation engine.
#[derive(Debug, Clone)]
pub struct BookingService {
    ledger: Arc<dyn InventoryLedger>,
    allocator: ReservationAllocator,
    confirmation: ConfirmationHandler,
    cancellation: CancellationHandler,
}

impl BookingService {
    /// Creates a new booking service.
    pub fn new(
        ledger: Arc<dyn InventoryLedger>,
        allocator: ReservationAllocator,
        confirmation: ConfirmationHandler,
        cancellation: CancellationHandler,
    ) -> Self {
        Self {
            ledger,
            allocator,
            confirmation,
            cancellation,
        }
    }

    /// Reserve seats for the caller. The booking stays pending until it is
    /// confirmed or its window closes.
    pub async fn book(
        &self,
        ctx: &RequestContext,
        event_id: EventId,
        seat_count: i32,
    ) -> AppResult<Booking> {
        let user = ctx.require_user(self.ledger.as_ref()).await?;
        self.allocator.allocate(event_id, user.id, seat_count).await
    }

    /// Confirm a pending booking by its code.
    ///
    /// Possession of the code is the authorization; the caller must have an
    /// account but need not own the booking.
    pub async fn confirm(&self, ctx: &RequestContext, booking_code: &str) -> AppResult<Booking> {
        ctx.require_user(self.ledger.as_ref()).await?;
        let booking = self.confirmation.confirm(booking_code).await?;
        if !booking.is_owned_by(ctx.user_id) {
            info!(
                booking_id = %booking.id,
                confirmed_by = %ctx.user_id,
                "Booking confirmed on behalf of its owner"
            );
        }
        Ok(booking)
    }

    /// Cancel one of the caller's bookings and return its seats.
    ///
    /// Cancelling an already cancelled booking succeeds without effect.
    pub async fn cancel(&self, ctx: &RequestContext, booking_id: BookingId) -> AppResult<Booking> {
        let booking = self
            .ledger
            .find_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::booking_not_found(format!("Booking {booking_id} not found")))?;

        if !booking.is_owned_by(ctx.user_id) {
            warn!(
                booking_id = %booking_id,
                user_id = %ctx.user_id,
                "Rejected cancellation of another user's booking"
            );
            return Err(AppError::forbidden("Only the booking owner can cancel it"));
        }

        let (booking, _) = self.cancellation.release(booking_id, ReleaseGuard::Any).await?;
        Ok(booking)
    }

    /// Look up one of the caller's bookings by code.
    pub async fn get_by_code(&self, ctx: &RequestContext, booking_code: &str) -> AppResult<Booking> {
        let booking = self
            .ledger
            .find_booking_by_code(booking_code.trim())
            .await?
            .ok_or_else(|| AppError::booking_not_found("No booking with this code"))?;

        if !booking.is_owned_by(ctx.user_id) {
            return Err(AppError::forbidden("Booking belongs to another user"));
        }
        Ok(booking)
    }
}
