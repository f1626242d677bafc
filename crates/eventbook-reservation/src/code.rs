//! Booking code generation.

use uuid::Uuid;

/// Source of opaque, globally unique booking codes.
pub trait BookingCodeGenerator: Send + Sync + std::fmt::Debug {
    /// Produce a fresh code.
    fn generate(&self) -> String;
}

/// Random UUID v4 codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidCodeGenerator;

impl BookingCodeGenerator for UuidCodeGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
