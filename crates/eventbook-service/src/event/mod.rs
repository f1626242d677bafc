//! Event creation and lookup.

pub mod service;

pub use service::{CreateEventRequest, EventService};
