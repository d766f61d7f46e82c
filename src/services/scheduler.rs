//! Periodic waiting list processing

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::database::BookingStore;
use crate::services::waiting_list::WaitingListManager;
use crate::utils::errors::{BookingError, Result};

/// Runs `process` for every event date with a non-empty queue
#[derive(Clone)]
pub struct WaitingListScheduler {
    store: Arc<dyn BookingStore>,
    manager: WaitingListManager,
    interval: Duration,
}

impl WaitingListScheduler {
    pub fn new(store: Arc<dyn BookingStore>, manager: WaitingListManager, interval: Duration) -> Self {
        Self { store, manager, interval }
    }

    /// One pass over all queues, returning how many entries were promoted
    ///
    /// A failing event date is logged and skipped so one bad queue does not
    /// starve the others.
    pub async fn tick(&self) -> Result<usize> {
        let event_date_ids = self.store.event_dates_with_waiting_entries().await?;
        let mut promoted = 0;

        for event_date_id in event_date_ids {
            match self.manager.process(event_date_id).await {
                Ok(count) => promoted += count,
                Err(BookingError::Locked { .. }) => {
                    debug!(event_date_id, "Skipping locked event date");
                }
                Err(e) if e.is_retryable() => {
                    warn!(event_date_id, error = %e, "Waiting list busy, retrying next tick");
                }
                Err(e) => {
                    error!(event_date_id, error = %e, "Waiting list processing failed");
                }
            }
        }

        if promoted > 0 {
            info!(promoted, "Scheduled waiting list processing promoted entries");
        }
        Ok(promoted)
    }

    /// Tick on an interval until `shutdown` turns true or its sender is dropped
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        info!("Started waiting list scheduler with interval {:?}", self.interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.tick().await {
                            error!("Waiting list scheduler tick failed: {}", e);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Stopped waiting list scheduler");
        })
    }
}
