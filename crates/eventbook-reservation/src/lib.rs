//! # eventbook-reservation
//!
//! The seat inventory ledger and the three operations that mutate it:
//! allocation, confirmation and cancellation. The ledger is a trait with a
//! PostgreSQL implementation and an in-process implementation that follows
//! the same locking contract.

pub mod allocator;
pub mod cancellation;
pub mod code;
pub mod confirmation;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod retry;

pub use allocator::ReservationAllocator;
pub use cancellation::CancellationHandler;
pub use code::{BookingCodeGenerator, UuidCodeGenerator};
pub use confirmation::ConfirmationHandler;
pub use ledger::InventoryLedger;
pub use memory::{InventoryAudit, MemoryLedger};
pub use postgres::PostgresLedger;
pub use retry::RetryPolicy;
