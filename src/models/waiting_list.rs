//! Waiting list model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::{BookingError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "waiting_list_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum WaitingListStatus {
    Waiting,
    Processed,
    Cancelled,
}

impl WaitingListStatus {
    pub const ALL: [&'static str; 3] = ["waiting", "processed", "cancelled"];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitingListStatus::Waiting => "waiting",
            WaitingListStatus::Processed => "processed",
            WaitingListStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, WaitingListStatus::Waiting)
    }
}

impl std::fmt::Display for WaitingListStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WaitingListStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "waiting" => Ok(WaitingListStatus::Waiting),
            "processed" => Ok(WaitingListStatus::Processed),
            "cancelled" => Ok(WaitingListStatus::Cancelled),
            other => Err(BookingError::InvalidInput(format!("Unknown waiting list status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct WaitingListEntry {
    pub id: i64,
    pub event_date_id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub number_of_students: i32,
    pub number_of_teachers: i32,
    pub special_requirements: Option<String>,
    pub contact_info: String,
    pub status: WaitingListStatus,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl WaitingListEntry {
    pub fn total_seats(&self) -> i32 {
        self.number_of_students + self.number_of_teachers
    }

    /// Move the entry to `next`, enforcing that terminal states stay put
    pub fn transition(&mut self, next: WaitingListStatus) -> Result<()> {
        if self.status == next {
            return Ok(());
        }
        if self.status.is_terminal() {
            return Err(BookingError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }

        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWaitingListRequest {
    pub event_date_id: i64,
    pub user_id: i64,
    pub number_of_students: i32,
    pub number_of_teachers: i32,
    pub contact_info: String,
    pub special_requirements: Option<String>,
}

/// Partial update; the position is never set directly
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWaitingListRequest {
    pub number_of_students: Option<i32>,
    pub number_of_teachers: Option<i32>,
    pub special_requirements: Option<String>,
    pub contact_info: Option<String>,
    pub status: Option<WaitingListStatus>,
}

#[derive(Debug, Clone)]
pub struct NewWaitingListEntry {
    pub event_date_id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub number_of_students: i32,
    pub number_of_teachers: i32,
    pub special_requirements: Option<String>,
    pub contact_info: String,
    pub position: i32,
}
