//! # eventbook-auth
//!
//! Bearer token verification for the EventBook API. Tokens are issued by the
//! identity service; this crate checks the HS256 signature and expiry and
//! yields the authenticated user ID.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
