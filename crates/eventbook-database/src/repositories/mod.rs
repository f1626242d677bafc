//! Repository implementations for EventBook entities.

pub mod booking;
pub mod event;
pub mod user;

pub use booking::BookingRepository;
pub use event::EventRepository;
pub use user::UserRepository;
