//! Unified application error types for EventBook.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The reservation-domain kinds
//! (`EventNotFound`, `InsufficientSeats`, `BookingNotFound`,
//! `SelfBookingForbidden`, `StorageUnavailable`) are stable and are surfaced
//! to callers by code.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The referenced event does not exist.
    EventNotFound,
    /// The event does not have enough available seats for the request.
    InsufficientSeats,
    /// No booking matches the given identifier or code in the required state.
    BookingNotFound,
    /// The caller attempted to book an event they created.
    SelfBookingForbidden,
    /// The backing store is transiently unavailable (retryable).
    StorageUnavailable,
    /// A generic resource was not found.
    NotFound,
    /// The caller is not authenticated or is unknown.
    Unauthorized,
    /// The caller is authenticated but may not act on the resource.
    Forbidden,
    /// Input validation failed.
    Validation,
    /// A uniqueness conflict occurred (retryable, e.g. booking code collision).
    Conflict,
    /// A non-transient database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
}

impl ErrorKind {
    /// Every kind, in declaration order.
    pub const ALL: [ErrorKind; 14] = [
        Self::EventNotFound,
        Self::InsufficientSeats,
        Self::BookingNotFound,
        Self::SelfBookingForbidden,
        Self::StorageUnavailable,
        Self::NotFound,
        Self::Unauthorized,
        Self::Forbidden,
        Self::Validation,
        Self::Conflict,
        Self::Database,
        Self::Configuration,
        Self::Serialization,
        Self::Internal,
    ];

    /// Whether an operation that failed with this kind may be re-attempted
    /// as a whole transaction.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::StorageUnavailable | Self::Conflict)
    }

    /// Whether the message attached to this kind may contain store-level
    /// detail that must not reach a client.
    pub fn is_opaque(self) -> bool {
        matches!(
            self,
            Self::StorageUnavailable
                | Self::Database
                | Self::Configuration
                | Self::Serialization
                | Self::Internal
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EventNotFound => write!(f, "EVENT_NOT_FOUND"),
            Self::InsufficientSeats => write!(f, "INSUFFICIENT_SEATS"),
            Self::BookingNotFound => write!(f, "BOOKING_NOT_FOUND"),
            Self::SelfBookingForbidden => write!(f, "SELF_BOOKING_FORBIDDEN"),
            Self::StorageUnavailable => write!(f, "STORAGE_UNAVAILABLE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout EventBook.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The referenced event does not exist.
    pub fn event_not_found(event_id: impl fmt::Display) -> Self {
        Self::new(ErrorKind::EventNotFound, format!("Event {event_id} not found"))
    }

    /// Not enough seats remain for the requested count.
    pub fn insufficient_seats(requested: i32, available: i32) -> Self {
        Self::new(
            ErrorKind::InsufficientSeats,
            format!("Requested {requested} seats but only {available} available"),
        )
    }

    /// No booking matched.
    pub fn booking_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BookingNotFound, message)
    }

    /// The caller is the organizer of the event.
    pub fn self_booking_forbidden() -> Self {
        Self::new(
            ErrorKind::SelfBookingForbidden,
            "Organizers cannot book their own events",
        )
    }

    /// Create a transient storage error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageUnavailable, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether the failed operation may be retried.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Message safe to hand to a client.
    pub fn public_message(&self) -> &str {
        if self.kind.is_opaque() {
            match self.kind {
                ErrorKind::StorageUnavailable => "The service is temporarily unavailable",
                _ => "An internal error occurred",
            }
        } else {
            &self.message
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
