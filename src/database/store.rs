//! Storage seam for the booking core
//!
//! Services talk to persistence only through [`BookingStore`] and the
//! unit-of-work it hands out, [`BookingTx`]. Every read that feeds a seat or
//! position decision goes through a locking read on the transaction, so the
//! decision and the write that follows it are serialized per row.

use async_trait::async_trait;

use crate::models::{
    CreateEventDateRequest, CreateEventRequest, Event, EventDate, NewReservation, NewWaitingListEntry, Reservation,
    WaitingListEntry,
};
use crate::query::ListQuery;
use crate::utils::errors::Result;

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Start a unit of work
    async fn begin(&self) -> Result<Box<dyn BookingTx>>;

    async fn create_event(&self, request: CreateEventRequest) -> Result<Event>;

    /// Create an event date with `available_spots = capacity`
    async fn create_event_date(&self, request: CreateEventDateRequest) -> Result<EventDate>;

    async fn find_event(&self, id: i64) -> Result<Option<Event>>;
    async fn find_event_date(&self, id: i64) -> Result<Option<EventDate>>;
    async fn find_reservation(&self, id: i64) -> Result<Option<Reservation>>;
    async fn find_reservation_by_code(&self, code: &str) -> Result<Option<Reservation>>;
    async fn find_waiting_entry(&self, id: i64) -> Result<Option<WaitingListEntry>>;

    async fn list_event_dates(&self, query: &ListQuery) -> Result<(Vec<EventDate>, u64)>;
    async fn list_reservations(&self, query: &ListQuery) -> Result<(Vec<Reservation>, u64)>;
    async fn list_waiting_entries(&self, query: &ListQuery) -> Result<(Vec<WaitingListEntry>, u64)>;

    /// Ids of event dates that currently have at least one WAITING entry
    async fn event_dates_with_waiting_entries(&self) -> Result<Vec<i64>>;

    async fn health_check(&self) -> Result<()>;
}

/// One unit of work
///
/// Dropping a transaction without calling [`BookingTx::commit`] rolls it back.
#[async_trait]
pub trait BookingTx: Send {
    async fn event_exists(&mut self, event_id: i64) -> Result<bool>;

    /// Read an event date and hold its row lock until the transaction ends
    async fn lock_event_date(&mut self, id: i64) -> Result<Option<EventDate>>;

    /// Persist capacity, available spots and lock state of an event date
    async fn save_event_date(&mut self, event_date: &EventDate) -> Result<()>;

    async fn reservation_code_exists(&mut self, code: &str) -> Result<bool>;
    async fn insert_reservation(&mut self, reservation: &NewReservation) -> Result<Reservation>;
    async fn lock_reservation(&mut self, id: i64) -> Result<Option<Reservation>>;

    /// Persist a modified reservation, stamping `updated_at`
    async fn save_reservation(&mut self, reservation: &Reservation) -> Result<Reservation>;

    /// Highest WAITING position for the event date, 0 when the queue is empty
    async fn max_waiting_position(&mut self, event_date_id: i64) -> Result<i32>;
    async fn insert_waiting_entry(&mut self, entry: &NewWaitingListEntry) -> Result<WaitingListEntry>;
    async fn lock_waiting_entry(&mut self, id: i64) -> Result<Option<WaitingListEntry>>;
    async fn save_waiting_entry(&mut self, entry: &WaitingListEntry) -> Result<WaitingListEntry>;
    async fn delete_waiting_entry(&mut self, id: i64) -> Result<()>;

    /// WAITING entries for the event date ordered by position, locked
    async fn waiting_entries(&mut self, event_date_id: i64) -> Result<Vec<WaitingListEntry>>;

    /// Decrement the position of every WAITING entry placed after `position`
    async fn shift_waiting_positions(&mut self, event_date_id: i64, position: i32) -> Result<u64>;

    /// Renumber WAITING entries 1..N keeping their relative order
    async fn compact_waiting_positions(&mut self, event_date_id: i64) -> Result<u64>;

    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;
}
