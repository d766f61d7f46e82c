//! EventDate capacity ledger
//!
//! The ledger owns `available_spots` for every event date. The public
//! operations each run in their own transaction; the crate-internal helpers
//! operate on an event date already locked inside a caller's transaction so
//! the reservation and waiting-list managers can combine seat changes with
//! their own writes atomically.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::database::{BookingStore, BookingTx};
use crate::models::{EventDate, Paginated, Release};
use crate::query::ListQuery;
use crate::utils::errors::{BookingError, Result};
use crate::utils::logging::log_capacity_anomaly;

pub const DEFAULT_LOCK_HOURS_BEFORE_START: i64 = 48;

/// Lock an event date row inside `tx`, failing when it does not exist
pub(crate) async fn lock_event_date(tx: &mut dyn BookingTx, event_date_id: i64) -> Result<EventDate> {
    tx.lock_event_date(event_date_id)
        .await?
        .ok_or(BookingError::EventDateNotFound { event_date_id })
}

/// Reject mutations on a frozen event date
pub(crate) fn ensure_unlocked(event_date: &EventDate) -> Result<()> {
    if event_date.is_locked_at(Utc::now()) {
        return Err(BookingError::Locked { event_date_id: event_date.id });
    }
    Ok(())
}

/// Take `seats` from a locked event date and persist the new balance
pub(crate) async fn take_seats(tx: &mut dyn BookingTx, event_date: &mut EventDate, seats: i32) -> Result<bool> {
    if !event_date.try_book(seats)? {
        debug!(
            event_date_id = event_date.id,
            requested = seats,
            available = event_date.available_spots,
            "Not enough seats"
        );
        return Ok(false);
    }

    tx.save_event_date(event_date).await?;
    Ok(true)
}

/// Return `seats` to a locked event date, clamping at capacity
pub(crate) async fn return_seats(tx: &mut dyn BookingTx, event_date: &mut EventDate, seats: i32) -> Result<Release> {
    let release = event_date.release(seats)?;
    if release.clamped > 0 {
        log_capacity_anomaly(event_date.id, seats, release.clamped, event_date.capacity);
    }

    tx.save_event_date(event_date).await?;
    Ok(release)
}

/// Lock two event dates in ascending id order
pub(crate) async fn lock_event_date_pair(
    tx: &mut dyn BookingTx,
    first_id: i64,
    second_id: i64,
) -> Result<(EventDate, EventDate)> {
    if first_id <= second_id {
        let first = lock_event_date(tx, first_id).await?;
        let second = lock_event_date(tx, second_id).await?;
        Ok((first, second))
    } else {
        let second = lock_event_date(tx, second_id).await?;
        let first = lock_event_date(tx, first_id).await?;
        Ok((first, second))
    }
}

#[derive(Clone)]
pub struct CapacityLedger {
    store: Arc<dyn BookingStore>,
    default_lock_hours: i64,
}

impl CapacityLedger {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store, default_lock_hours: DEFAULT_LOCK_HOURS_BEFORE_START }
    }

    pub fn with_default_lock_hours(mut self, hours: i64) -> Self {
        self.default_lock_hours = hours;
        self
    }

    /// Atomically take `seats` if they are all available
    ///
    /// `Ok(false)` means the date is currently too full. Asking for more than
    /// the date's capacity is an `InvalidSeatCount` error.
    #[instrument(skip(self))]
    pub async fn book_seats(&self, event_date_id: i64, seats: i32) -> Result<bool> {
        let mut tx = self.store.begin().await?;
        let mut event_date = lock_event_date(tx.as_mut(), event_date_id).await?;

        let booked = take_seats(tx.as_mut(), &mut event_date, seats).await?;
        if booked {
            tx.commit().await?;
            debug!(event_date_id, seats, available = event_date.available_spots, "Seats booked");
        } else {
            tx.rollback().await?;
        }
        Ok(booked)
    }

    /// Return seats, never exceeding capacity
    #[instrument(skip(self))]
    pub async fn release_seats(&self, event_date_id: i64, seats: i32) -> Result<Release> {
        let mut tx = self.store.begin().await?;
        let mut event_date = lock_event_date(tx.as_mut(), event_date_id).await?;

        let release = return_seats(tx.as_mut(), &mut event_date, seats).await?;
        tx.commit().await?;

        debug!(event_date_id, released = release.released, available = event_date.available_spots, "Seats released");
        Ok(release)
    }

    pub async fn is_locked(&self, event_date_id: i64) -> Result<bool> {
        Ok(self.event_date(event_date_id).await?.is_locked_at(Utc::now()))
    }

    pub async fn available_spots(&self, event_date_id: i64) -> Result<i32> {
        Ok(self.event_date(event_date_id).await?.available_spots)
    }

    pub async fn event_date(&self, event_date_id: i64) -> Result<EventDate> {
        self.store
            .find_event_date(event_date_id)
            .await?
            .ok_or(BookingError::EventDateNotFound { event_date_id })
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Paginated<EventDate>> {
        let (items, total) = self.store.list_event_dates(query).await?;
        Ok(Paginated::new(items, total, query.page, query.page_size))
    }

    /// Freeze the date `hours_before` hours ahead of its start (default from config)
    #[instrument(skip(self))]
    pub async fn set_lock_time(&self, event_date_id: i64, hours_before: Option<i64>) -> Result<EventDate> {
        let hours_before = hours_before.unwrap_or(self.default_lock_hours);

        let mut tx = self.store.begin().await?;
        let mut event_date = lock_event_date(tx.as_mut(), event_date_id).await?;
        let lock_time = event_date.lock_before_start(hours_before)?;
        tx.save_event_date(&event_date).await?;
        tx.commit().await?;

        info!(event_date_id, %lock_time, "Event date lock time set");
        Ok(event_date)
    }

    /// Explicit organizer freeze or unfreeze
    #[instrument(skip(self))]
    pub async fn set_locked(&self, event_date_id: i64, locked: bool) -> Result<EventDate> {
        let mut tx = self.store.begin().await?;
        let mut event_date = lock_event_date(tx.as_mut(), event_date_id).await?;
        event_date.locked = locked;
        tx.save_event_date(&event_date).await?;
        tx.commit().await?;

        info!(event_date_id, locked, "Event date lock flag changed");
        Ok(event_date)
    }

    /// Change capacity while keeping the seats already held
    #[instrument(skip(self))]
    pub async fn resize(&self, event_date_id: i64, capacity: i32) -> Result<EventDate> {
        let mut tx = self.store.begin().await?;
        let mut event_date = lock_event_date(tx.as_mut(), event_date_id).await?;
        let taken = event_date.taken();
        event_date.resize(capacity)?;
        tx.save_event_date(&event_date).await?;
        tx.commit().await?;

        if taken > capacity {
            log_capacity_anomaly(event_date_id, taken, taken - capacity, capacity);
        }
        info!(event_date_id, capacity, available = event_date.available_spots, "Event date resized");
        Ok(event_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryBookingStore;
    use crate::models::{CreateEventDateRequest, CreateEventRequest};
    use assert_matches::assert_matches;
    use chrono::{Duration, NaiveDate, NaiveTime};

    async fn ledger_with_date(capacity: i32) -> (CapacityLedger, i64) {
        let store = Arc::new(InMemoryBookingStore::new());
        let event = store.create_event(CreateEventRequest { title: "Theatre".to_string() }).await.unwrap();
        let date = store
            .create_event_date(CreateEventDateRequest {
                event_id: event.id,
                date: NaiveDate::from_ymd_opt(2031, 6, 1).unwrap(),
                time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                capacity,
            })
            .await
            .unwrap();
        (CapacityLedger::new(store), date.id)
    }

    #[tokio::test]
    async fn test_book_and_release() {
        let (ledger, id) = ledger_with_date(5).await;

        assert!(ledger.book_seats(id, 3).await.unwrap());
        assert!(!ledger.book_seats(id, 3).await.unwrap());
        assert_eq!(ledger.available_spots(id).await.unwrap(), 2);

        let release = ledger.release_seats(id, 3).await.unwrap();
        assert_eq!(release.released, 3);
        assert_eq!(ledger.available_spots(id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_over_capacity_request_is_an_error() {
        let (ledger, id) = ledger_with_date(5).await;
        assert_matches!(ledger.book_seats(id, 6).await, Err(BookingError::InvalidSeatCount { requested: 6, capacity: 5 }));
        assert_matches!(ledger.book_seats(99, 1).await, Err(BookingError::EventDateNotFound { event_date_id: 99 }));
    }

    #[tokio::test]
    async fn test_double_release_is_clamped() {
        let (ledger, id) = ledger_with_date(5).await;
        assert!(ledger.book_seats(id, 2).await.unwrap());

        ledger.release_seats(id, 2).await.unwrap();
        let second = ledger.release_seats(id, 2).await.unwrap();
        assert_eq!(second.released, 0);
        assert_eq!(second.clamped, 2);
        assert_eq!(ledger.available_spots(id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_lock_flag_and_lock_time() {
        let (ledger, id) = ledger_with_date(5).await;
        assert!(!ledger.is_locked(id).await.unwrap());

        ledger.set_locked(id, true).await.unwrap();
        assert!(ledger.is_locked(id).await.unwrap());
        ledger.set_locked(id, false).await.unwrap();

        let date = ledger.set_lock_time(id, None).await.unwrap();
        assert_eq!(date.lock_time, Some(date.starts_at() - Duration::hours(48)));
        assert!(!ledger.is_locked(id).await.unwrap());

        // A lock time far enough ahead of the start has already passed
        ledger.set_lock_time(id, Some(24 * 365 * 20)).await.unwrap();
        assert!(ledger.is_locked(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_resize_keeps_taken_seats() {
        let (ledger, id) = ledger_with_date(10).await;
        assert!(ledger.book_seats(id, 6).await.unwrap());

        let grown = ledger.resize(id, 12).await.unwrap();
        assert_eq!(grown.available_spots, 6);

        let shrunk = ledger.resize(id, 4).await.unwrap();
        assert_eq!(shrunk.capacity, 4);
        assert_eq!(shrunk.available_spots, 0);

        assert_matches!(ledger.resize(id, -1).await, Err(BookingError::InvalidInput(_)));
    }
}
