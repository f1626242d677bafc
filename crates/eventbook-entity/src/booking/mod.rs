//! Booking domain entities.

pub mod model;
pub mod release;
pub mod status;

pub use model::{Booking, NewBooking};
pub use release::{ReleaseGuard, ReleaseOutcome};
pub use status::BookingStatus;
