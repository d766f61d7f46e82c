//! In-process storage backend
//!
//! A single async mutex guards the whole state, so a transaction owns the
//! store exclusively from `begin` until it commits, rolls back or is dropped.
//! Rollback restores the snapshot taken at `begin`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::store::{BookingStore, BookingTx};
use crate::models::{
    CreateEventDateRequest, CreateEventRequest, Event, EventDate, NewReservation, NewWaitingListEntry, Reservation,
    WaitingListEntry, WaitingListStatus,
};
use crate::query::ListQuery;
use crate::utils::errors::{BookingError, Result};

#[derive(Debug, Clone, Default)]
struct Sequences {
    event: i64,
    event_date: i64,
    reservation: i64,
    waiting_list: i64,
}

fn next_id(sequence: &mut i64) -> i64 {
    *sequence += 1;
    *sequence
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: BTreeMap<i64, Event>,
    event_dates: BTreeMap<i64, EventDate>,
    reservations: BTreeMap<i64, Reservation>,
    waiting_list: BTreeMap<i64, WaitingListEntry>,
    sequences: Sequences,
}

impl MemoryState {
    fn waiting_for_date(&mut self, event_date_id: i64) -> Vec<&mut WaitingListEntry> {
        let mut entries: Vec<&mut WaitingListEntry> = self
            .waiting_list
            .values_mut()
            .filter(|e| e.event_date_id == event_date_id && e.status == WaitingListStatus::Waiting)
            .collect();
        entries.sort_by_key(|e| (e.position, e.id));
        entries
    }
}

/// Booking store kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>> {
        let guard = self.state.clone().lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemoryTx { guard: Some(guard), snapshot: Some(snapshot) }))
    }

    async fn create_event(&self, request: CreateEventRequest) -> Result<Event> {
        let mut state = self.state.lock().await;
        let event = Event {
            id: next_id(&mut state.sequences.event),
            title: request.title,
            created_at: Utc::now(),
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn create_event_date(&self, request: CreateEventDateRequest) -> Result<EventDate> {
        if request.capacity < 0 {
            return Err(BookingError::InvalidInput(format!("Capacity must not be negative, got {}", request.capacity)));
        }

        let mut state = self.state.lock().await;
        if !state.events.contains_key(&request.event_id) {
            return Err(BookingError::EventNotFound { event_id: request.event_id });
        }

        let event_date = EventDate {
            id: next_id(&mut state.sequences.event_date),
            event_id: request.event_id,
            date: request.date,
            time: request.time,
            capacity: request.capacity,
            available_spots: request.capacity,
            locked: false,
            lock_time: None,
        };
        state.event_dates.insert(event_date.id, event_date.clone());
        Ok(event_date)
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>> {
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn find_event_date(&self, id: i64) -> Result<Option<EventDate>> {
        Ok(self.state.lock().await.event_dates.get(&id).cloned())
    }

    async fn find_reservation(&self, id: i64) -> Result<Option<Reservation>> {
        Ok(self.state.lock().await.reservations.get(&id).cloned())
    }

    async fn find_reservation_by_code(&self, code: &str) -> Result<Option<Reservation>> {
        let state = self.state.lock().await;
        Ok(state.reservations.values().find(|r| r.local_reservation_code == code).cloned())
    }

    async fn find_waiting_entry(&self, id: i64) -> Result<Option<WaitingListEntry>> {
        Ok(self.state.lock().await.waiting_list.get(&id).cloned())
    }

    async fn list_event_dates(&self, query: &ListQuery) -> Result<(Vec<EventDate>, u64)> {
        let state = self.state.lock().await;
        query.apply(state.event_dates.values().cloned())
    }

    async fn list_reservations(&self, query: &ListQuery) -> Result<(Vec<Reservation>, u64)> {
        let state = self.state.lock().await;
        query.apply(state.reservations.values().cloned())
    }

    async fn list_waiting_entries(&self, query: &ListQuery) -> Result<(Vec<WaitingListEntry>, u64)> {
        let state = self.state.lock().await;
        query.apply(state.waiting_list.values().cloned())
    }

    async fn event_dates_with_waiting_entries(&self) -> Result<Vec<i64>> {
        let state = self.state.lock().await;
        let mut ids: Vec<i64> = state
            .waiting_list
            .values()
            .filter(|e| e.status == WaitingListStatus::Waiting)
            .map(|e| e.event_date_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Holds the store lock until commit or rollback
struct MemoryTx {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    snapshot: Option<MemoryState>,
}

impl MemoryTx {
    fn state(&mut self) -> Result<&mut MemoryState> {
        self.guard
            .as_deref_mut()
            .ok_or_else(|| BookingError::Internal("transaction already finished".to_string()))
    }

    fn finish(&mut self) -> Result<OwnedMutexGuard<MemoryState>> {
        self.guard
            .take()
            .ok_or_else(|| BookingError::Internal("transaction already finished".to_string()))
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if let (Some(guard), Some(snapshot)) = (self.guard.as_deref_mut(), self.snapshot.take()) {
            *guard = snapshot;
        }
    }
}

#[async_trait]
impl BookingTx for MemoryTx {
    async fn event_exists(&mut self, event_id: i64) -> Result<bool> {
        Ok(self.state()?.events.contains_key(&event_id))
    }

    async fn lock_event_date(&mut self, id: i64) -> Result<Option<EventDate>> {
        Ok(self.state()?.event_dates.get(&id).cloned())
    }

    async fn save_event_date(&mut self, event_date: &EventDate) -> Result<()> {
        let stored = self
            .state()?
            .event_dates
            .get_mut(&event_date.id)
            .ok_or(BookingError::EventDateNotFound { event_date_id: event_date.id })?;

        if event_date.available_spots < 0 || event_date.available_spots > event_date.capacity {
            return Err(BookingError::Internal(format!(
                "event date {} would leave available_spots {} outside 0..={}",
                event_date.id, event_date.available_spots, event_date.capacity
            )));
        }

        stored.capacity = event_date.capacity;
        stored.available_spots = event_date.available_spots;
        stored.locked = event_date.locked;
        stored.lock_time = event_date.lock_time;
        Ok(())
    }

    async fn reservation_code_exists(&mut self, code: &str) -> Result<bool> {
        Ok(self.state()?.reservations.values().any(|r| r.local_reservation_code == code))
    }

    async fn insert_reservation(&mut self, new: &NewReservation) -> Result<Reservation> {
        let state = self.state()?;
        if state.reservations.values().any(|r| r.local_reservation_code == new.local_reservation_code) {
            return Err(BookingError::Internal(format!(
                "duplicate reservation code {}",
                new.local_reservation_code
            )));
        }

        let now = Utc::now();
        let reservation = Reservation {
            id: next_id(&mut state.sequences.reservation),
            event_id: new.event_id,
            event_date_id: new.event_date_id,
            user_id: new.user_id,
            number_of_students: new.number_of_students,
            number_of_teachers: new.number_of_teachers,
            total_seats: new.total_seats(),
            special_requirements: new.special_requirements.clone(),
            contact_info: new.contact_info.clone(),
            status: new.status,
            local_reservation_code: new.local_reservation_code.clone(),
            created_at: now,
            updated_at: now,
            cancelled_at: None,
        };
        state.reservations.insert(reservation.id, reservation.clone());
        Ok(reservation)
    }

    async fn lock_reservation(&mut self, id: i64) -> Result<Option<Reservation>> {
        Ok(self.state()?.reservations.get(&id).cloned())
    }

    async fn save_reservation(&mut self, reservation: &Reservation) -> Result<Reservation> {
        let stored = self
            .state()?
            .reservations
            .get_mut(&reservation.id)
            .ok_or_else(|| BookingError::ReservationNotFound { reservation: reservation.id.to_string() })?;

        *stored = Reservation { updated_at: Utc::now(), ..reservation.clone() };
        Ok(stored.clone())
    }

    async fn max_waiting_position(&mut self, event_date_id: i64) -> Result<i32> {
        Ok(self
            .state()?
            .waiting_for_date(event_date_id)
            .iter()
            .map(|e| e.position)
            .max()
            .unwrap_or(0))
    }

    async fn insert_waiting_entry(&mut self, new: &NewWaitingListEntry) -> Result<WaitingListEntry> {
        let state = self.state()?;
        let entry = WaitingListEntry {
            id: next_id(&mut state.sequences.waiting_list),
            event_date_id: new.event_date_id,
            event_id: new.event_id,
            user_id: new.user_id,
            number_of_students: new.number_of_students,
            number_of_teachers: new.number_of_teachers,
            special_requirements: new.special_requirements.clone(),
            contact_info: new.contact_info.clone(),
            status: WaitingListStatus::Waiting,
            position: new.position,
            created_at: Utc::now(),
        };
        state.waiting_list.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn lock_waiting_entry(&mut self, id: i64) -> Result<Option<WaitingListEntry>> {
        Ok(self.state()?.waiting_list.get(&id).cloned())
    }

    async fn save_waiting_entry(&mut self, entry: &WaitingListEntry) -> Result<WaitingListEntry> {
        let stored = self
            .state()?
            .waiting_list
            .get_mut(&entry.id)
            .ok_or(BookingError::WaitingListEntryNotFound { entry_id: entry.id })?;

        *stored = entry.clone();
        Ok(stored.clone())
    }

    async fn delete_waiting_entry(&mut self, id: i64) -> Result<()> {
        self.state()?
            .waiting_list
            .remove(&id)
            .map(|_| ())
            .ok_or(BookingError::WaitingListEntryNotFound { entry_id: id })
    }

    async fn waiting_entries(&mut self, event_date_id: i64) -> Result<Vec<WaitingListEntry>> {
        Ok(self
            .state()?
            .waiting_for_date(event_date_id)
            .into_iter()
            .map(|e| e.clone())
            .collect())
    }

    async fn shift_waiting_positions(&mut self, event_date_id: i64, position: i32) -> Result<u64> {
        let mut shifted = 0;
        for entry in self.state()?.waiting_for_date(event_date_id) {
            if entry.position > position {
                entry.position -= 1;
                shifted += 1;
            }
        }
        Ok(shifted)
    }

    async fn compact_waiting_positions(&mut self, event_date_id: i64) -> Result<u64> {
        let mut moved = 0;
        for (index, entry) in self.state()?.waiting_for_date(event_date_id).into_iter().enumerate() {
            let position = index as i32 + 1;
            if entry.position != position {
                entry.position = position;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn commit(&mut self) -> Result<()> {
        let guard = self.finish()?;
        self.snapshot = None;
        drop(guard);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let mut guard = self.finish()?;
        if let Some(snapshot) = self.snapshot.take() {
            *guard = snapshot;
        }
        Ok(())
    }
}
