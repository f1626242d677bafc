//! # eventbook-core
//!
//! Core crate for EventBook. Contains configuration schemas, typed
//! identifiers, the clock abstraction, lifespan parsing, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other EventBook crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
