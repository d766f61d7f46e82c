//! Database module
//!
//! This module handles database connections, the storage seam used by the
//! services and its Postgres and in-memory implementations.

pub mod connection;
pub mod memory;
pub mod postgres;
pub mod repositories;
pub mod store;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool};
pub use memory::InMemoryBookingStore;
pub use postgres::{PgBookingStore, PgBookingTx};
pub use store::{BookingStore, BookingTx};
