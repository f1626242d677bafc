//! Route handlers grouped by resource.

pub mod booking;
pub mod event;
pub mod health;
