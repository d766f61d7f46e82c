//! Test context for unified test setup
//!
//! Wires an [`InMemoryBookingStore`] into the full service stack with a
//! running notification worker backed by a [`RecordingNotifier`].

use std::sync::{Arc, Once};

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use tokio::task::JoinHandle;

use seatkeeper::config::Settings;
use seatkeeper::handlers::{EventDateHandler, ReservationHandler, WaitingListHandler};
use seatkeeper::models::{CreateEventDateRequest, CreateEventRequest, Event, EventDate};
use seatkeeper::services::{NotificationService, ProcessingPolicy, ServiceFactory};
use seatkeeper::{BookingStore, InMemoryBookingStore};

use super::test_data::RecordingNotifier;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("seatkeeper=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Unified test context that manages all test components
pub struct TestContext {
    pub store: Arc<InMemoryBookingStore>,
    pub services: ServiceFactory,
    pub notifier: Arc<RecordingNotifier>,
    pub settings: Settings,
    notification_worker: Option<JoinHandle<()>>,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_settings(test_settings()).await
    }

    pub async fn with_policy(policy: ProcessingPolicy) -> Self {
        let mut settings = test_settings();
        settings.waiting_list.policy = policy;
        Self::with_settings(settings).await
    }

    pub async fn with_settings(settings: Settings) -> Self {
        init_test_logging();

        let store = Arc::new(InMemoryBookingStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let (notifications, notification_worker) = NotificationService::start(notifier.clone(), &settings.notifications);
        let services = ServiceFactory::new(store.clone(), notifications, &settings);

        Self {
            store,
            services,
            notifier,
            settings,
            notification_worker,
        }
    }

    pub fn reservation_handler(&self) -> ReservationHandler {
        ReservationHandler::new(&self.services, self.settings.booking.conflict_retry_attempts)
    }

    pub fn waiting_list_handler(&self) -> WaitingListHandler {
        WaitingListHandler::new(&self.services, self.settings.booking.conflict_retry_attempts)
    }

    pub fn event_date_handler(&self) -> EventDateHandler {
        EventDateHandler::new(&self.services, self.settings.booking.conflict_retry_attempts)
    }

    pub async fn create_event(&self, title: &str) -> Event {
        self.store
            .create_event(CreateEventRequest { title: title.to_string() })
            .await
            .expect("Failed to create event")
    }

    /// A date a month from now, far from any automatic lock
    pub async fn create_event_date_for(&self, event: &Event, capacity: i32) -> EventDate {
        let starts = Utc::now() + Duration::days(30);
        self.store
            .create_event_date(CreateEventDateRequest {
                event_id: event.id,
                date: starts.date_naive(),
                time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                capacity,
            })
            .await
            .expect("Failed to create event date")
    }

    /// A fresh event with one date of `capacity` seats
    pub async fn create_event_date(&self, capacity: i32) -> EventDate {
        let event = self.create_event("Museum workshop").await;
        self.create_event_date_for(&event, capacity).await
    }

    /// A date whose start has already passed
    pub async fn create_past_event_date(&self, capacity: i32) -> EventDate {
        let event = self.create_event("Past workshop").await;
        self.store
            .create_event_date(CreateEventDateRequest {
                event_id: event.id,
                date: NaiveDate::from_ymd_opt(2020, 1, 15).unwrap(),
                time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                capacity,
            })
            .await
            .expect("Failed to create event date")
    }

    pub async fn event_date(&self, event_date_id: i64) -> EventDate {
        self.store
            .find_event_date(event_date_id)
            .await
            .expect("Failed to load event date")
            .expect("Event date disappeared")
    }

    pub async fn available_spots(&self, event_date_id: i64) -> i32 {
        self.event_date(event_date_id).await.available_spots
    }

    /// Set the remaining seats directly, bypassing the reservation flow
    pub async fn set_available_spots(&self, event_date_id: i64, available_spots: i32) {
        let mut tx = self.store.begin().await.unwrap();
        let mut event_date = tx.lock_event_date(event_date_id).await.unwrap().unwrap();
        event_date.available_spots = available_spots;
        tx.save_event_date(&event_date).await.unwrap();
        tx.commit().await.unwrap();
    }

    pub async fn lock(&self, event_date_id: i64) {
        self.services.ledger.set_locked(event_date_id, true).await.unwrap();
    }

    pub async fn unlock(&self, event_date_id: i64) {
        self.services.ledger.set_locked(event_date_id, false).await.unwrap();
    }

    /// Wait for the notification worker to drain its queue
    pub async fn flush_notifications(&self) {
        self.services.notifications.flush().await;
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(worker) = self.notification_worker.take() {
            worker.abort();
        }
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.waiting_list.scheduler_enabled = false;
    settings.notifications.enabled = true;
    settings
}
