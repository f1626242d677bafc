//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use eventbook_auth::jwt::JwtDecoder;
use eventbook_core::config::AppConfig;
use eventbook_core::traits::Clock;
use eventbook_reservation::{
    CancellationHandler, ConfirmationHandler, InventoryLedger, ReservationAllocator, RetryPolicy,
};
use eventbook_service::{BookingService, EventService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Bearer token verifier.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Seat inventory store.
    pub ledger: Arc<dyn InventoryLedger>,
    /// Event use cases.
    pub event_service: Arc<EventService>,
    /// Booking use cases.
    pub booking_service: Arc<BookingService>,
    /// Process start, for uptime reporting.
    pub started_at: Instant,
}

impl AppState {
    /// Wire services over `ledger`, retrying transient store failures as
    /// configured.
    pub fn new(config: AppConfig, ledger: Arc<dyn InventoryLedger>, clock: Arc<dyn Clock>) -> Self {
        let retry = RetryPolicy::new(config.retry.clone());

        let booking_service = BookingService::new(
            ledger.clone(),
            ReservationAllocator::new(ledger.clone(), clock.clone(), retry.clone()),
            ConfirmationHandler::new(ledger.clone(), clock.clone(), retry.clone()),
            CancellationHandler::new(ledger.clone(), clock.clone(), retry),
        );

        Self {
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
            event_service: Arc::new(EventService::new(ledger.clone(), clock)),
            booking_service: Arc::new(booking_service),
            ledger,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}
