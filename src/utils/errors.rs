//! Error handling for Seatkeeper
//!
//! This module defines the main error type used throughout the booking core
//! and the helpers the response layer uses to classify it.

use thiserror::Error;

/// Main error type for Seatkeeper operations
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Event date not found: {event_date_id}")]
    EventDateNotFound { event_date_id: i64 },

    #[error("Reservation not found: {reservation}")]
    ReservationNotFound { reservation: String },

    #[error("Waiting list entry not found: {entry_id}")]
    WaitingListEntryNotFound { entry_id: i64 },

    #[error("User {user_id} has no waiting list entry for event date {event_date_id}")]
    NoWaitingListEntry { event_date_id: i64, user_id: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid seat count: {requested} seats requested, event date capacity is {capacity}")]
    InvalidSeatCount { requested: i32, capacity: i32 },

    #[error("Insufficient capacity on event date {event_date_id}: {requested} requested, {available} available")]
    InsufficientCapacity { event_date_id: i64, requested: i32, available: i32 },

    #[error("Reservation {reservation_id} is already cancelled")]
    AlreadyCancelled { reservation_id: i64 },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Event date {event_date_id} is locked")]
    Locked { event_date_id: i64 },

    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("No acting user in the current request")]
    Unauthenticated,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Seatkeeper operations
pub type Result<T> = std::result::Result<T, BookingError>;

/// Postgres SQLSTATE codes that signal lock contention or a lost update
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

impl From<sqlx::Error> for BookingError {
    fn from(error: sqlx::Error) -> Self {
        let conflict = error
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| matches!(&*code, SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE))
            .unwrap_or(false);

        if conflict {
            BookingError::ConcurrencyConflict(error.to_string())
        } else {
            BookingError::Database(error)
        }
    }
}

impl BookingError {
    /// Check if the operation may succeed when retried unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::ConcurrencyConflict(_))
    }

    /// Check if the error was caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BookingError::EventNotFound { .. }
                | BookingError::EventDateNotFound { .. }
                | BookingError::ReservationNotFound { .. }
                | BookingError::WaitingListEntryNotFound { .. }
                | BookingError::NoWaitingListEntry { .. }
                | BookingError::InvalidInput(_)
                | BookingError::InvalidSeatCount { .. }
                | BookingError::InsufficientCapacity { .. }
                | BookingError::AlreadyCancelled { .. }
                | BookingError::InvalidStateTransition { .. }
                | BookingError::Locked { .. }
                | BookingError::Unauthenticated
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BookingError::Database(_) => ErrorSeverity::Critical,
            BookingError::Migration(_) => ErrorSeverity::Critical,
            BookingError::Config(_) => ErrorSeverity::Critical,
            BookingError::Internal(_) => ErrorSeverity::Error,
            BookingError::Io(_) => ErrorSeverity::Error,
            BookingError::Serialization(_) => ErrorSeverity::Error,
            BookingError::ConcurrencyConflict(_) => ErrorSeverity::Warning,
            BookingError::Unauthenticated => ErrorSeverity::Warning,
            _ => ErrorSeverity::Info,
        }
    }

    /// HTTP-style status code used by the response contract
    pub fn status_code(&self) -> u16 {
        match self {
            BookingError::EventNotFound { .. }
            | BookingError::EventDateNotFound { .. }
            | BookingError::ReservationNotFound { .. }
            | BookingError::WaitingListEntryNotFound { .. }
            | BookingError::NoWaitingListEntry { .. } => 404,
            BookingError::InvalidInput(_) | BookingError::InvalidSeatCount { .. } => 400,
            BookingError::InsufficientCapacity { .. }
            | BookingError::AlreadyCancelled { .. }
            | BookingError::InvalidStateTransition { .. } => 409,
            BookingError::Locked { .. } => 423,
            BookingError::Unauthenticated => 401,
            BookingError::ConcurrencyConflict(_) => 503,
            _ => 500,
        }
    }

    /// Message safe to hand back to a caller
    ///
    /// Infrastructure failures collapse into a generic message; their detail
    /// only goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            BookingError::Database(_)
            | BookingError::Migration(_)
            | BookingError::Config(_)
            | BookingError::Internal(_)
            | BookingError::Serialization(_)
            | BookingError::Io(_) => "Internal server error".to_string(),
            BookingError::ConcurrencyConflict(_) => "The request conflicted with a concurrent update, please retry".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_not_retryable() {
        let error = BookingError::InsufficientCapacity { event_date_id: 1, requested: 5, available: 4 };
        assert!(error.is_client_error());
        assert!(!error.is_retryable());
        assert_eq!(error.status_code(), 409);
    }

    #[test]
    fn test_conflict_is_retryable() {
        let error = BookingError::ConcurrencyConflict("row lock timeout".to_string());
        assert!(error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_internal_detail_is_hidden() {
        let error = BookingError::Internal("connection reset by peer at 10.0.0.3".to_string());
        assert_eq!(error.public_message(), "Internal server error");
        assert_eq!(error.status_code(), 500);
    }

    #[test]
    fn test_not_found_is_distinct_from_already_cancelled() {
        let missing = BookingError::ReservationNotFound { reservation: "42".to_string() };
        let cancelled = BookingError::AlreadyCancelled { reservation_id: 42 };
        assert_eq!(missing.status_code(), 404);
        assert_eq!(cancelled.status_code(), 409);
        assert!(cancelled.public_message().contains("already cancelled"));
    }

    #[test]
    fn test_plain_sqlx_error_stays_database() {
        let error: BookingError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, BookingError::Database(_)));
        assert_eq!(error.severity(), ErrorSeverity::Critical);
    }
}
