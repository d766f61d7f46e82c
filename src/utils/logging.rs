//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the booking core.

use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::utils::errors::{BookingError, Result};

/// Initialize logging based on configuration
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the process. No guard is returned when file logging is off.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| BookingError::Config(format!("Invalid log level '{}': {}", config.level, e)))?;

    let (file_layer, guard) = match config.directory.as_deref() {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(file_layer)
        .try_init()
        .map_err(|e| BookingError::Config(format!("Failed to install logger: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log reservation lifecycle actions
pub fn log_reservation_action(reservation_id: i64, action: &str, event_date_id: i64, seats: i32) {
    info!(
        reservation_id = reservation_id,
        action = action,
        event_date_id = event_date_id,
        seats = seats,
        "Reservation action performed"
    );
}

/// Log waiting list actions
pub fn log_waiting_list_action(entry_id: i64, action: &str, event_date_id: i64, position: Option<i32>) {
    info!(
        entry_id = entry_id,
        action = action,
        event_date_id = event_date_id,
        position = position,
        "Waiting list action performed"
    );
}

/// Log a seat release that would have overflowed capacity
pub fn log_capacity_anomaly(event_date_id: i64, requested: i32, clamped: i32, capacity: i32) {
    warn!(
        event_date_id = event_date_id,
        requested = requested,
        clamped = clamped,
        capacity = capacity,
        "Seat release clamped to capacity"
    );
}

/// Log database operations
pub fn log_database_operation(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Database operation failed"
        );
    }
}
