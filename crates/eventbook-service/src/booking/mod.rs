//! Booking lifecycle use cases.

pub mod service;

pub use service::BookingService;
