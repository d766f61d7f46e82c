//! Test database helper utilities
//!
//! The Postgres tests run only when `TEST_DATABASE_URL` points at a
//! disposable database; every test starts from empty tables.

use std::sync::Arc;

use sqlx::PgPool;

use seatkeeper::database::{run_migrations, PgBookingStore};

use super::test_context::init_test_logging;

pub const TEST_DATABASE_URL: &str = "TEST_DATABASE_URL";

/// Test database helper that manages PostgreSQL test database setup
pub struct TestDatabase {
    pub pool: PgPool,
    pub database_url: String,
}

impl TestDatabase {
    /// Connect and migrate, or `None` when no test database is configured
    pub async fn from_env() -> Option<Self> {
        init_test_logging();

        let Ok(database_url) = std::env::var(TEST_DATABASE_URL) else {
            eprintln!("{} not set, skipping Postgres test", TEST_DATABASE_URL);
            return None;
        };

        let pool = PgPool::connect(&database_url).await.expect("Failed to connect to test database");
        run_migrations(&pool).await.expect("Failed to run migrations");

        let database = Self { pool, database_url };
        database.cleanup().await.expect("Failed to clean test database");
        Some(database)
    }

    pub fn store(&self) -> Arc<PgBookingStore> {
        Arc::new(PgBookingStore::new(self.pool.clone()))
    }

    /// Clean all test data from the database
    pub async fn cleanup(&self) -> Result<(), sqlx::Error> {
        sqlx::query("TRUNCATE waiting_list, reservation, event_date, event RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
