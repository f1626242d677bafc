//! Classification of sqlx failures into application error kinds.
//!
//! Transient conditions become `StorageUnavailable` so that callers retry
//! the whole transaction. A booking-code collision becomes `Conflict`,
//! which is also retried with a fresh code. Everything else is `Database`.

use eventbook_core::error::{AppError, ErrorKind};

const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";
const QUERY_CANCELED: &str = "57014";
const ADMIN_SHUTDOWN: &str = "57P01";
const CANNOT_CONNECT_NOW: &str = "57P03";

/// Map a sqlx error raised before `COMMIT` to an [`AppError`].
pub fn classify(context: &str, err: sqlx::Error) -> AppError {
    AppError::with_source(kind_of(&err), context, err)
}

/// Map a failure of `COMMIT` itself.
///
/// The outcome of the transaction is unknown at this point, so the error is
/// never retryable.
pub fn commit_failed(err: sqlx::Error) -> AppError {
    AppError::with_source(ErrorKind::Database, "Failed to commit transaction", err)
}

fn kind_of(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => ErrorKind::StorageUnavailable,
        sqlx::Error::Database(db) => {
            if db.is_unique_violation() {
                return ErrorKind::Conflict;
            }
            match db.code().as_deref() {
                Some(
                    SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE
                    | QUERY_CANCELED | ADMIN_SHUTDOWN | CANNOT_CONNECT_NOW,
                ) => ErrorKind::StorageUnavailable,
                _ => ErrorKind::Database,
            }
        }
        _ => ErrorKind::Database,
    }
}
