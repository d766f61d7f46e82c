//! Data models module
//!
//! This module contains all data structures used throughout the booking core

pub mod event;
pub mod reservation;
pub mod waiting_list;
pub mod response;

// Re-export commonly used models
pub use event::{Event, EventDate, CreateEventRequest, CreateEventDateRequest, Release};
pub use reservation::{Reservation, ReservationStatus, CreateReservationRequest, UpdateReservationRequest, NewReservation};
pub use waiting_list::{WaitingListEntry, WaitingListStatus, CreateWaitingListRequest, UpdateWaitingListRequest, NewWaitingListEntry};
pub use response::{ApiResponse, Paginated};
