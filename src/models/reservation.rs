//! Reservation model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::{BookingError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "reservation_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Created,
}

impl ReservationStatus {
    pub const ALL: [&'static str; 4] = ["pending", "confirmed", "cancelled", "created"];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Created => "created",
        }
    }

    /// Whether the reservation still holds seats on its event date
    pub fn holds_seats(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "created" => Ok(ReservationStatus::Created),
            other => Err(BookingError::InvalidInput(format!("Unknown reservation status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Reservation {
    pub id: i64,
    pub event_id: i64,
    pub event_date_id: i64,
    pub user_id: i64,
    pub number_of_students: i32,
    pub number_of_teachers: i32,
    pub total_seats: i32,
    pub special_requirements: Option<String>,
    pub contact_info: String,
    pub status: ReservationStatus,
    pub local_reservation_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservationRequest {
    pub event_id: i64,
    pub event_date_id: i64,
    pub user_id: i64,
    pub number_of_students: i32,
    pub number_of_teachers: i32,
    pub contact_info: String,
    pub special_requirements: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateReservationRequest {
    pub event_date_id: Option<i64>,
    pub number_of_students: Option<i32>,
    pub number_of_teachers: Option<i32>,
    pub contact_info: Option<String>,
    pub special_requirements: Option<String>,
}

/// Row to insert once seats have been taken from the ledger
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub event_id: i64,
    pub event_date_id: i64,
    pub user_id: i64,
    pub number_of_students: i32,
    pub number_of_teachers: i32,
    pub special_requirements: Option<String>,
    pub contact_info: String,
    pub status: ReservationStatus,
    pub local_reservation_code: String,
}

impl NewReservation {
    pub fn total_seats(&self) -> i32 {
        self.number_of_students + self.number_of_teachers
    }
}

/// Validate a student/teacher split and return the seat total
pub fn seat_total(number_of_students: i32, number_of_teachers: i32) -> Result<i32> {
    if number_of_students < 0 || number_of_teachers < 0 {
        return Err(BookingError::InvalidInput("Number of students and teachers must not be negative".to_string()));
    }

    let total = number_of_students
        .checked_add(number_of_teachers)
        .ok_or_else(|| BookingError::InvalidInput("Seat count is too large".to_string()))?;

    if total == 0 {
        return Err(BookingError::InvalidInput(
            "Invalid number of seats. The number of seats must be greater than zero.".to_string(),
        ));
    }

    Ok(total)
}
