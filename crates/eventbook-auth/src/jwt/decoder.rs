//! JWT verification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use eventbook_core::config::auth::AuthConfig;
use eventbook_core::error::AppError;

use super::claims::Claims;

/// Validates HS256 access tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates a token string.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::unauthorized("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::unauthorized("Invalid token signature")
                    }
                    _ => AppError::unauthorized("Invalid token"),
                }
            })
    }

    /// Extracts and validates the token from an `Authorization` header value.
    pub fn decode_bearer(&self, header: &str) -> Result<Claims, AppError> {
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::unauthorized("Expected a bearer token"))?;
        self.decode(token)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};
    use eventbook_core::ErrorKind;
    use eventbook_core::types::UserId;

    use super::*;
    use crate::jwt::encoder::JwtEncoder;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            leeway_seconds: 0,
        }
    }

    #[test]
    fn test_valid_token_yields_subject() {
        let config = config("secret-a");
        let user_id = UserId::new();
        let token = JwtEncoder::new(&config)
            .encode(user_id, TimeDelta::minutes(5))
            .unwrap();

        let claims = JwtDecoder::new(&config).decode(&token).unwrap();
        assert_eq!(claims.user_id(), user_id);
        assert!(claims.expires_at().unwrap() > Utc::now());
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = JwtEncoder::new(&config("secret-a"))
            .encode(UserId::new(), TimeDelta::minutes(5))
            .unwrap();

        let err = JwtDecoder::new(&config("secret-b")).decode(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }

    #[test]
    fn test_expired_token_is_unauthorized() {
        let config = config("secret-a");
        let token = JwtEncoder::new(&config)
            .encode(UserId::new(), TimeDelta::minutes(-10))
            .unwrap();

        let err = JwtDecoder::new(&config).decode(&token).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(err.message, "Token has expired");
    }

    #[test]
    fn test_bearer_header_parsing() {
        let config = config("secret-a");
        let decoder = JwtDecoder::new(&config);
        let token = JwtEncoder::new(&config)
            .encode(UserId::new(), TimeDelta::minutes(5))
            .unwrap();

        assert!(decoder.decode_bearer(&format!("Bearer {token}")).is_ok());
        assert!(decoder.decode_bearer(&token).is_err());
        assert!(decoder.decode_bearer("Bearer ").is_err());
        assert!(decoder.decode_bearer("Basic dXNlcjpwYXNz").is_err());
    }

    #[test]
    fn test_garbage_token_is_unauthorized() {
        let err = JwtDecoder::new(&config("secret-a"))
            .decode("not.a.token")
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
    }
}
