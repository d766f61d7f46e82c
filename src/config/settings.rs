//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::services::waiting_list::ProcessingPolicy;

const ENV_PREFIX: &str = "SEATKEEPER";
const DEFAULT_CONFIG_FILE: &str = "seatkeeper";

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub booking: BookingConfig,
    pub waiting_list: WaitingListConfig,
    pub notifications: NotificationConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for the daily rolling log file; stdout only when unset
    pub directory: Option<String>,
    pub file_prefix: String,
}

/// Reservation behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingConfig {
    /// How many fresh codes to try before giving up on a collision streak
    pub code_generation_attempts: u32,
    /// Attempts for a mutation that keeps hitting lock conflicts
    pub conflict_retry_attempts: u32,
}

/// Waiting list behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaitingListConfig {
    pub policy: ProcessingPolicy,
    pub scheduler_enabled: bool,
    pub processing_interval_seconds: u64,
    pub lock_hours_before_start: i64,
}

/// Notification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub default_language: String,
}

impl Settings {
    /// Load settings from `seatkeeper.toml` (optional) and `SEATKEEPER__*` variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(DEFAULT_CONFIG_FILE)
    }

    /// Load settings with an explicit config file name, still layered over defaults
    pub fn load(config_file: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&Settings::default())?;
        let config_file = config_file.as_ref().to_string_lossy().into_owned();

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name(&config_file).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::BookingError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgresql://localhost/seatkeeper".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 5,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: None,
                file_prefix: "seatkeeper.log".to_string(),
            },
            booking: BookingConfig {
                code_generation_attempts: 10,
                conflict_retry_attempts: 3,
            },
            waiting_list: WaitingListConfig {
                policy: ProcessingPolicy::StrictFifo,
                scheduler_enabled: false,
                processing_interval_seconds: 60,
                lock_hours_before_start: 48,
            },
            notifications: NotificationConfig {
                enabled: true,
                default_language: "en".to_string(),
            },
        }
    }
}
