//! # eventbook-entity
//!
//! Domain entity models for EventBook. Every struct in this crate
//! represents a database table row or a domain value object. Row types
//! derive `sqlx::FromRow` alongside the serde traits.

pub mod booking;
pub mod event;
pub mod user;
