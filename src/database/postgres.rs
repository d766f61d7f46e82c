//! Postgres storage backend
//!
//! Each [`PgBookingTx`] wraps one `sqlx` transaction; locking reads use
//! `SELECT ... FOR UPDATE` so concurrent units of work on the same event
//! date queue behind each other instead of racing.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, Transaction};

use super::connection::{self, DatabasePool};
use super::repositories::{
    EventDateRepository, EventRepository, ReservationRepository, WaitingListRepository,
};
use super::store::{BookingStore, BookingTx};
use crate::models::{
    CreateEventDateRequest, CreateEventRequest, Event, EventDate, NewReservation, NewWaitingListEntry, Reservation,
    WaitingListEntry,
};
use crate::query::ListQuery;
use crate::utils::errors::{BookingError, Result};
use crate::utils::logging::log_database_operation;

#[derive(Debug, Clone)]
pub struct PgBookingStore {
    pool: DatabasePool,
    events: EventRepository,
    event_dates: EventDateRepository,
    reservations: ReservationRepository,
    waiting_list: WaitingListRepository,
}

impl PgBookingStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            event_dates: EventDateRepository::new(pool.clone()),
            reservations: ReservationRepository::new(pool.clone()),
            waiting_list: WaitingListRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn begin(&self) -> Result<Box<dyn BookingTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBookingTx { tx: Some(tx), started: Instant::now() }))
    }

    async fn create_event(&self, request: CreateEventRequest) -> Result<Event> {
        self.events.create(request).await
    }

    async fn create_event_date(&self, request: CreateEventDateRequest) -> Result<EventDate> {
        if request.capacity < 0 {
            return Err(BookingError::InvalidInput(format!("Capacity must not be negative, got {}", request.capacity)));
        }
        if self.events.find_by_id(request.event_id).await?.is_none() {
            return Err(BookingError::EventNotFound { event_id: request.event_id });
        }
        self.event_dates.create(request).await
    }

    async fn find_event(&self, id: i64) -> Result<Option<Event>> {
        self.events.find_by_id(id).await
    }

    async fn find_event_date(&self, id: i64) -> Result<Option<EventDate>> {
        self.event_dates.find_by_id(id).await
    }

    async fn find_reservation(&self, id: i64) -> Result<Option<Reservation>> {
        self.reservations.find_by_id(id).await
    }

    async fn find_reservation_by_code(&self, code: &str) -> Result<Option<Reservation>> {
        self.reservations.find_by_code(code).await
    }

    async fn find_waiting_entry(&self, id: i64) -> Result<Option<WaitingListEntry>> {
        self.waiting_list.find_by_id(id).await
    }

    async fn list_event_dates(&self, query: &ListQuery) -> Result<(Vec<EventDate>, u64)> {
        self.event_dates.list(query).await
    }

    async fn list_reservations(&self, query: &ListQuery) -> Result<(Vec<Reservation>, u64)> {
        self.reservations.list(query).await
    }

    async fn list_waiting_entries(&self, query: &ListQuery) -> Result<(Vec<WaitingListEntry>, u64)> {
        self.waiting_list.list(query).await
    }

    async fn event_dates_with_waiting_entries(&self) -> Result<Vec<i64>> {
        self.waiting_list.event_dates_with_waiting().await
    }

    async fn health_check(&self) -> Result<()> {
        connection::health_check(&self.pool).await
    }
}

/// A unit of work on Postgres; rolled back by `sqlx` when dropped uncommitted
pub struct PgBookingTx {
    tx: Option<Transaction<'static, Postgres>>,
    started: Instant,
}

impl PgBookingTx {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        match self.tx.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(BookingError::Internal("transaction already finished".to_string())),
        }
    }

    fn finish(&mut self) -> Result<Transaction<'static, Postgres>> {
        self.tx
            .take()
            .ok_or_else(|| BookingError::Internal("transaction already finished".to_string()))
    }
}

#[async_trait]
impl BookingTx for PgBookingTx {
    async fn event_exists(&mut self, event_id: i64) -> Result<bool> {
        EventRepository::exists(self.conn()?, event_id).await
    }

    async fn lock_event_date(&mut self, id: i64) -> Result<Option<EventDate>> {
        EventDateRepository::lock(self.conn()?, id).await
    }

    async fn save_event_date(&mut self, event_date: &EventDate) -> Result<()> {
        EventDateRepository::save(self.conn()?, event_date).await
    }

    async fn reservation_code_exists(&mut self, code: &str) -> Result<bool> {
        ReservationRepository::code_exists(self.conn()?, code).await
    }

    async fn insert_reservation(&mut self, reservation: &NewReservation) -> Result<Reservation> {
        ReservationRepository::insert(self.conn()?, reservation).await
    }

    async fn lock_reservation(&mut self, id: i64) -> Result<Option<Reservation>> {
        ReservationRepository::lock(self.conn()?, id).await
    }

    async fn save_reservation(&mut self, reservation: &Reservation) -> Result<Reservation> {
        ReservationRepository::save(self.conn()?, reservation).await
    }

    async fn max_waiting_position(&mut self, event_date_id: i64) -> Result<i32> {
        WaitingListRepository::max_position(self.conn()?, event_date_id).await
    }

    async fn insert_waiting_entry(&mut self, entry: &NewWaitingListEntry) -> Result<WaitingListEntry> {
        WaitingListRepository::insert(self.conn()?, entry).await
    }

    async fn lock_waiting_entry(&mut self, id: i64) -> Result<Option<WaitingListEntry>> {
        WaitingListRepository::lock(self.conn()?, id).await
    }

    async fn save_waiting_entry(&mut self, entry: &WaitingListEntry) -> Result<WaitingListEntry> {
        WaitingListRepository::save(self.conn()?, entry).await
    }

    async fn delete_waiting_entry(&mut self, id: i64) -> Result<()> {
        WaitingListRepository::delete(self.conn()?, id).await
    }

    async fn waiting_entries(&mut self, event_date_id: i64) -> Result<Vec<WaitingListEntry>> {
        WaitingListRepository::lock_queue(self.conn()?, event_date_id).await
    }

    async fn shift_waiting_positions(&mut self, event_date_id: i64, position: i32) -> Result<u64> {
        WaitingListRepository::shift_after(self.conn()?, event_date_id, position).await
    }

    async fn compact_waiting_positions(&mut self, event_date_id: i64) -> Result<u64> {
        WaitingListRepository::compact(self.conn()?, event_date_id).await
    }

    async fn commit(&mut self) -> Result<()> {
        let result = self.finish()?.commit().await;
        log_database_operation("commit", "-", self.started.elapsed().as_millis() as u64, result.is_ok());
        Ok(result?)
    }

    async fn rollback(&mut self) -> Result<()> {
        let result = self.finish()?.rollback().await;
        log_database_operation("rollback", "-", self.started.elapsed().as_millis() as u64, result.is_ok());
        Ok(result?)
    }
}
