//! # eventbook-service
//!
//! Application use cases for EventBook. Services receive their collaborators
//! as `Arc`s at construction time and take a [`RequestContext`] identifying
//! the authenticated caller.

pub mod booking;
pub mod context;
pub mod event;

pub use booking::BookingService;
pub use context::RequestContext;
pub use event::{CreateEventRequest, EventService};
