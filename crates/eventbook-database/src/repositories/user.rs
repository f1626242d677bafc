//! User repository implementation.

use sqlx::PgPool;

use eventbook_core::result::AppResult;
use eventbook_core::types::UserId;
use eventbook_entity::user::User;

use crate::error::classify;

/// Read-only access to accounts managed by the identity service.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT id, email, name, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify("Failed to find user", e))
    }
}
