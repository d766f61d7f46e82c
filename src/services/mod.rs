//! Services module
//!
//! This module contains the booking core: the capacity ledger, the
//! reservation and waiting list managers, and their collaborators.

pub mod identity;
pub mod ledger;
pub mod notification;
pub mod reservation;
pub mod scheduler;
pub mod waiting_list;

// Re-export commonly used services
pub use identity::{IdentityProvider, StaticIdentity};
pub use ledger::CapacityLedger;
pub use notification::{LogNotifier, MessageTemplate, Notification, NotificationService, NotificationStats, Notifier};
pub use reservation::ReservationManager;
pub use scheduler::WaitingListScheduler;
pub use waiting_list::{ProcessingPolicy, WaitingListManager};

use std::sync::Arc;
use std::time::Duration;

use crate::config::settings::Settings;
use crate::database::BookingStore;

/// Service factory wiring every manager to one store and notification queue
#[derive(Clone)]
pub struct ServiceFactory {
    pub store: Arc<dyn BookingStore>,
    pub ledger: CapacityLedger,
    pub reservations: ReservationManager,
    pub waiting_list: WaitingListManager,
    pub notifications: NotificationService,
    processing_interval: Duration,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(store: Arc<dyn BookingStore>, notifications: NotificationService, settings: &Settings) -> Self {
        let ledger = CapacityLedger::new(store.clone())
            .with_default_lock_hours(settings.waiting_list.lock_hours_before_start);
        let reservations = ReservationManager::new(store.clone(), notifications.clone())
            .with_code_attempts(settings.booking.code_generation_attempts);
        let waiting_list = WaitingListManager::new(store.clone(), notifications.clone())
            .with_policy(settings.waiting_list.policy)
            .with_code_attempts(settings.booking.code_generation_attempts);

        Self {
            store,
            ledger,
            reservations,
            waiting_list,
            notifications,
            processing_interval: Duration::from_secs(settings.waiting_list.processing_interval_seconds),
        }
    }

    pub fn scheduler(&self) -> WaitingListScheduler {
        WaitingListScheduler::new(self.store.clone(), self.waiting_list.clone(), self.processing_interval)
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = self.store.health_check().await.is_ok();

        ServiceHealthStatus {
            database_healthy,
            notifications_enabled: self.notifications.is_enabled(),
            processing_policy: self.waiting_list.policy(),
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub notifications_enabled: bool,
    pub processing_policy: ProcessingPolicy,
}

impl ServiceHealthStatus {
    /// Notifications are optional; only the database is critical
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if !self.notifications_enabled {
            issues.push("Notification worker not running".to_string());
        }

        issues
    }
}
