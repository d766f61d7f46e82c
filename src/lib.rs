//! Seatkeeper
//!
//! Reservation and waiting-list capacity controller for scheduled event
//! dates. Organizers publish dates with a fixed number of seats, schools
//! reserve seats against them, and a per-date waiting list absorbs overflow
//! demand and is promoted as seats free up.

pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod query;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{BookingError, Result};

// Re-export main components for easy access
pub use database::{BookingStore, InMemoryBookingStore, PgBookingStore};
pub use services::{CapacityLedger, ReservationManager, ServiceFactory, WaitingListManager};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
