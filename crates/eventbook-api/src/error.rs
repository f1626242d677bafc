//! Maps domain `AppError` to HTTP responses through the local `ApiError`
//! wrapper.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use eventbook_core::error::{AppError, ErrorKind};

/// HTTP status for every error kind.
const STATUS_TABLE: [(ErrorKind, StatusCode); 14] = [
    (ErrorKind::EventNotFound, StatusCode::NOT_FOUND),
    (ErrorKind::InsufficientSeats, StatusCode::CONFLICT),
    (ErrorKind::BookingNotFound, StatusCode::NOT_FOUND),
    (ErrorKind::SelfBookingForbidden, StatusCode::FORBIDDEN),
    (ErrorKind::StorageUnavailable, StatusCode::SERVICE_UNAVAILABLE),
    (ErrorKind::NotFound, StatusCode::NOT_FOUND),
    (ErrorKind::Unauthorized, StatusCode::UNAUTHORIZED),
    (ErrorKind::Forbidden, StatusCode::FORBIDDEN),
    (ErrorKind::Validation, StatusCode::BAD_REQUEST),
    (ErrorKind::Conflict, StatusCode::CONFLICT),
    (ErrorKind::Database, StatusCode::INTERNAL_SERVER_ERROR),
    (ErrorKind::Configuration, StatusCode::INTERNAL_SERVER_ERROR),
    (ErrorKind::Serialization, StatusCode::INTERNAL_SERVER_ERROR),
    (ErrorKind::Internal, StatusCode::INTERNAL_SERVER_ERROR),
];

/// Looks up the response status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    STATUS_TABLE
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, status)| *status)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Handler and extractor error type. Wraps an [`AppError`] so it can be
/// turned into a response inside this crate.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Result alias for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = status_for(err.kind);

        if err.kind.is_opaque() {
            let cause = std::error::Error::source(&err).map(ToString::to_string);
            if status == StatusCode::SERVICE_UNAVAILABLE {
                warn!(kind = %err.kind, error = %err.message, cause = ?cause, "Store unavailable");
            } else {
                error!(kind = %err.kind, error = %err.message, cause = ?cause, "Request failed");
            }
        }

        let body = ApiErrorResponse {
            success: false,
            error: err.kind.to_string(),
            message: err.public_message().to_string(),
        };

        (status, Json(body)).into_response()
    }
}
