//! Convenience result type alias for EventBook.

use crate::error::AppError;

/// A specialized `Result` type for EventBook operations.
pub type AppResult<T> = Result<T, AppError>;
