//! Typed path parameter helpers.

use uuid::Uuid;

use eventbook_core::error::AppError;

/// Parses a UUID-backed identifier from a path segment.
pub fn parse_id<T: From<Uuid>>(s: &str) -> Result<T, AppError> {
    Uuid::parse_str(s)
        .map(T::from)
        .map_err(|_| AppError::validation(format!("Invalid ID: {s}")))
}
