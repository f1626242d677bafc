//! # eventbook-worker
//!
//! Background tasks for EventBook. Currently this is the expiry sweeper,
//! which returns the seats of pending bookings whose reservation window
//! has closed.

pub mod sweeper;

pub use sweeper::{ExpirySweeper, SweepReport, SweeperPhase};
