//! User entity model.

use chrono::{DateTime, Utc};
use eventbook_core::types::UserId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An account known to the booking engine.
///
/// Users are registered by the external identity service. This crate only
/// reads them to check that a bearer token refers to a real account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,
    /// Email address.
    pub email: String,
    /// Human-readable display name.
    pub name: String,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
}
