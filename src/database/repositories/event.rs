//! Event and event date repository implementation

use chrono::Utc;
use sqlx::{PgConnection, PgPool};

use crate::models::event::{CreateEventDateRequest, CreateEventRequest, Event, EventDate};
use crate::query::{sql, ListQuery};
use crate::utils::errors::BookingError;

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event, BookingError> {
        let event = sqlx::query_as::<_, Event>(
            "INSERT INTO event (title, created_at) VALUES ($1, $2) RETURNING id, title, created_at"
        )
        .bind(request.title)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, BookingError> {
        let event = sqlx::query_as::<_, Event>("SELECT id, title, created_at FROM event WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(event)
    }

    /// Check for an event inside a transaction
    pub async fn exists(conn: &mut PgConnection, id: i64) -> Result<bool, BookingError> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM event WHERE id = $1)")
            .bind(id)
            .fetch_one(conn)
            .await?;

        Ok(exists)
    }
}

#[derive(Debug, Clone)]
pub struct EventDateRepository {
    pool: PgPool,
}

impl EventDateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create an event date with every seat available
    pub async fn create(&self, request: CreateEventDateRequest) -> Result<EventDate, BookingError> {
        let event_date = sqlx::query_as::<_, EventDate>(
            r#"
            INSERT INTO event_date (event_id, date, time, capacity, available_spots, locked)
            VALUES ($1, $2, $3, $4, $4, FALSE)
            RETURNING id, event_id, date, time, capacity, available_spots, locked, lock_time
            "#
        )
        .bind(request.event_id)
        .bind(request.date)
        .bind(request.time)
        .bind(request.capacity)
        .fetch_one(&self.pool)
        .await?;

        Ok(event_date)
    }

    /// Find event date by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<EventDate>, BookingError> {
        let event_date = sqlx::query_as::<_, EventDate>(
            "SELECT id, event_id, date, time, capacity, available_spots, locked, lock_time FROM event_date WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event_date)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<EventDate>, u64), BookingError> {
        sql::fetch_page(&self.pool, query).await
    }

    /// Read an event date and hold its row lock for the rest of the transaction
    pub async fn lock(conn: &mut PgConnection, id: i64) -> Result<Option<EventDate>, BookingError> {
        let event_date = sqlx::query_as::<_, EventDate>(
            "SELECT id, event_id, date, time, capacity, available_spots, locked, lock_time FROM event_date WHERE id = $1 FOR UPDATE"
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(event_date)
    }

    /// Write back the seat and lock columns
    pub async fn save(conn: &mut PgConnection, event_date: &EventDate) -> Result<(), BookingError> {
        let result = sqlx::query(
            r#"
            UPDATE event_date
            SET capacity = $2, available_spots = $3, locked = $4, lock_time = $5
            WHERE id = $1
            "#
        )
        .bind(event_date.id)
        .bind(event_date.capacity)
        .bind(event_date.available_spots)
        .bind(event_date.locked)
        .bind(event_date.lock_time)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::EventDateNotFound { event_date_id: event_date.id });
        }
        Ok(())
    }
}
