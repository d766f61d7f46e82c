//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use tracing_subscriber::EnvFilter;

use super::Settings;
use crate::services::notification::SUPPORTED_LANGUAGES;
use crate::utils::errors::{BookingError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_logging_config(&settings.logging)?;
    validate_booking_config(&settings.booking)?;
    validate_waiting_list_config(&settings.waiting_list)?;
    validate_notification_config(&settings.notifications)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(BookingError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(BookingError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(BookingError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    if config.acquire_timeout_seconds == 0 {
        return Err(BookingError::Config(
            "Acquire timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if EnvFilter::try_new(&config.level).is_err() {
        return Err(BookingError::Config(format!(
            "Invalid log level: {}", config.level
        )));
    }

    if config.file_prefix.is_empty() {
        return Err(BookingError::Config(
            "Log file prefix is required".to_string()
        ));
    }

    if matches!(config.directory.as_deref(), Some("")) {
        return Err(BookingError::Config(
            "Log directory must not be empty when set".to_string()
        ));
    }

    Ok(())
}

/// Validate booking configuration
fn validate_booking_config(config: &super::BookingConfig) -> Result<()> {
    if config.code_generation_attempts == 0 {
        return Err(BookingError::Config(
            "Code generation attempts must be greater than 0".to_string()
        ));
    }

    if config.conflict_retry_attempts == 0 {
        return Err(BookingError::Config(
            "Conflict retry attempts must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate waiting list configuration
fn validate_waiting_list_config(config: &super::WaitingListConfig) -> Result<()> {
    if config.processing_interval_seconds == 0 {
        return Err(BookingError::Config(
            "Processing interval must be greater than 0".to_string()
        ));
    }

    if config.lock_hours_before_start < 0 {
        return Err(BookingError::Config(
            "Lock hours before start must not be negative".to_string()
        ));
    }

    Ok(())
}

/// Validate notification configuration
fn validate_notification_config(config: &super::NotificationConfig) -> Result<()> {
    if !SUPPORTED_LANGUAGES.contains(&config.default_language.as_str()) {
        return Err(BookingError::Config(format!(
            "Default language '{}' must be one of: {}",
            config.default_language,
            SUPPORTED_LANGUAGES.join(", ")
        )));
    }

    Ok(())
}
