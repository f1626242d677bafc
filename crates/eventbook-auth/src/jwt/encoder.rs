//! Token signing with the shared secret.
//!
//! Production tokens come from the identity service. This signer mints
//! compatible tokens for local tooling and integration tests.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};

use eventbook_core::config::auth::AuthConfig;
use eventbook_core::error::AppError;
use eventbook_core::types::UserId;

use super::claims::Claims;

/// Creates signed HS256 access tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").finish_non_exhaustive()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// Sign a token for `user_id` valid for `ttl`.
    pub fn encode(&self, user_id: UserId, ttl: TimeDelta) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }
}
