//! Seatkeeper
//!
//! Main application entry point

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};

use seatkeeper::{
    config::Settings,
    database::{connection, PgBookingStore},
    services::{LogNotifier, NotificationService, ServiceFactory},
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the settings read the environment
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file appender on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", seatkeeper::info());

    // Initialize database connection
    info!("Connecting to database...");
    let pool = connection::create_pool(&settings.database).await?;

    // Run database migrations
    connection::run_migrations(&pool).await?;

    // Start the notification worker
    let (notifications, notification_worker) =
        NotificationService::start(Arc::new(LogNotifier), &settings.notifications);

    // Initialize services
    info!("Initializing services...");
    let store = Arc::new(PgBookingStore::new(pool));
    let services = ServiceFactory::new(store, notifications.clone(), &settings);

    let health = services.health_check().await;
    for issue in health.get_issues() {
        warn!("Service issue: {}", issue);
    }

    // Start the waiting list scheduler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = if settings.waiting_list.scheduler_enabled {
        Some(services.scheduler().spawn(shutdown_rx))
    } else {
        info!("Waiting list scheduler disabled");
        None
    };

    info!(policy = %settings.waiting_list.policy, "Seatkeeper is ready!");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            error!("Waiting list scheduler ended abnormally: {}", e);
        }
    }

    // Deliver whatever is still queued before the worker goes away
    notifications.flush().await;
    if let Some(worker) = notification_worker {
        worker.abort();
    }

    info!("Seatkeeper has been shut down.");
    Ok(())
}
