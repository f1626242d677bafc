//! Request context carrying the authenticated user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use eventbook_core::error::AppError;
use eventbook_core::result::AppResult;
use eventbook_core::types::UserId;
use eventbook_entity::user::User;
use eventbook_reservation::InventoryLedger;

/// Context for the current authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID, taken from the bearer token subject.
    pub user_id: UserId,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context.
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            request_time: Utc::now(),
        }
    }

    /// Load the caller's account. A valid token for an unknown account is
    /// treated as unauthenticated.
    pub async fn require_user(&self, ledger: &dyn InventoryLedger) -> AppResult<User> {
        ledger
            .find_user(self.user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("Unknown user"))
    }
}
