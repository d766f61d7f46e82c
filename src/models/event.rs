//! Event and event date models
//!
//! An [`EventDate`] is the capacity ledger row for one scheduled occurrence of
//! an [`Event`]. Seat accounting goes through [`EventDate::try_book`] and
//! [`EventDate::release`] so the bounds `0 <= available_spots <= capacity`
//! are enforced in one place.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::{BookingError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct EventDate {
    pub id: i64,
    pub event_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub capacity: i32,
    pub available_spots: i32,
    pub locked: bool,
    pub lock_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventDateRequest {
    pub event_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub capacity: i32,
}

/// Outcome of returning seats to a ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    pub released: i32,
    /// Seats that would have pushed `available_spots` above capacity
    pub clamped: i32,
}

impl EventDate {
    /// Seats currently held by reservations
    pub fn taken(&self) -> i32 {
        self.capacity - self.available_spots
    }

    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.time).and_utc()
    }

    /// Whether booking and waiting-list changes are frozen at `now`
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.locked || self.lock_time.map(|lock_time| now >= lock_time).unwrap_or(false)
    }

    /// Take `seats` from the ledger if they are all available
    ///
    /// Returns `Ok(false)` without touching the ledger when the date is
    /// currently too full. Asking for more seats than the date could ever
    /// hold is a caller error.
    pub fn try_book(&mut self, seats: i32) -> Result<bool> {
        if seats <= 0 {
            return Err(BookingError::InvalidInput(format!("Seat count must be positive, got {}", seats)));
        }
        if seats > self.capacity {
            return Err(BookingError::InvalidSeatCount { requested: seats, capacity: self.capacity });
        }
        if self.available_spots < seats {
            return Ok(false);
        }

        self.available_spots -= seats;
        Ok(true)
    }

    /// Return `seats` to the ledger, never exceeding capacity
    pub fn release(&mut self, seats: i32) -> Result<Release> {
        if seats < 0 {
            return Err(BookingError::InvalidInput(format!("Seat count must not be negative, got {}", seats)));
        }

        let room = self.capacity - self.available_spots;
        let released = seats.min(room);
        self.available_spots += released;

        Ok(Release { released, clamped: seats - released })
    }

    /// Change the capacity while keeping the seats already taken
    pub fn resize(&mut self, capacity: i32) -> Result<()> {
        if capacity < 0 {
            return Err(BookingError::InvalidInput(format!("Capacity must not be negative, got {}", capacity)));
        }

        let taken = self.taken();
        self.capacity = capacity;
        self.available_spots = (capacity - taken).max(0);
        Ok(())
    }

    /// Lock the date `hours_before` hours ahead of its start
    pub fn lock_before_start(&mut self, hours_before: i64) -> Result<DateTime<Utc>> {
        if hours_before < 0 {
            return Err(BookingError::InvalidInput(format!("hours_before must not be negative, got {}", hours_before)));
        }

        let lock_time = Duration::try_hours(hours_before)
            .and_then(|offset| self.starts_at().checked_sub_signed(offset))
            .ok_or_else(|| BookingError::InvalidInput(format!("hours_before is out of range, got {}", hours_before)))?;
        self.lock_time = Some(lock_time);
        Ok(lock_time)
    }
}
