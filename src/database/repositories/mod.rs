//! Database repositories module
//!
//! Pool-backed reads live on the repository structs; the associated
//! functions taking a `PgConnection` run inside a caller's transaction.

pub mod event;
pub mod reservation;
pub mod waiting_list;

// Re-export repositories
pub use event::{EventDateRepository, EventRepository};
pub use reservation::ReservationRepository;
pub use waiting_list::WaitingListRepository;
