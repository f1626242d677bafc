//! # eventbook-database
//!
//! PostgreSQL connection management, migrations, and the repositories that
//! perform seat-inventory mutations under row-level locks.

pub mod connection;
pub mod error;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
