//! Shared domain types.

pub mod id;
pub mod lifespan;

pub use id::{BookingId, EventId, UserId};
pub use lifespan::ReservationLifespan;
