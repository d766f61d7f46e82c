//! Waiting list repository implementation
//!
//! Position maintenance runs as set-based statements so a reorder never
//! leaves the queue half renumbered.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};

use crate::models::waiting_list::{NewWaitingListEntry, WaitingListEntry};
use crate::query::{sql, ListQuery};
use crate::utils::errors::BookingError;

#[derive(Debug, Clone)]
pub struct WaitingListRepository {
    pool: PgPool,
}

impl WaitingListRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find entry by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<WaitingListEntry>, BookingError> {
        let entry = sqlx::query_as::<_, WaitingListEntry>(
            r#"
            SELECT id, event_date_id, event_id, user_id, number_of_students, number_of_teachers,
                   special_requirements, contact_info, status, position, created_at
            FROM waiting_list WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<WaitingListEntry>, u64), BookingError> {
        sql::fetch_page(&self.pool, query).await
    }

    /// Event dates with a non-empty queue
    pub async fn event_dates_with_waiting(&self) -> Result<Vec<i64>, BookingError> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT event_date_id FROM waiting_list WHERE status = 'waiting' ORDER BY event_date_id"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn max_position(conn: &mut PgConnection, event_date_id: i64) -> Result<i32, BookingError> {
        let max = sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(position), 0) FROM waiting_list WHERE event_date_id = $1 AND status = 'waiting'"
        )
        .bind(event_date_id)
        .fetch_one(conn)
        .await?;

        Ok(max)
    }

    pub async fn insert(conn: &mut PgConnection, new: &NewWaitingListEntry) -> Result<WaitingListEntry, BookingError> {
        let entry = sqlx::query_as::<_, WaitingListEntry>(
            r#"
            INSERT INTO waiting_list (event_date_id, event_id, user_id, number_of_students, number_of_teachers,
                                      special_requirements, contact_info, status, position, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'waiting', $8, $9)
            RETURNING id, event_date_id, event_id, user_id, number_of_students, number_of_teachers,
                      special_requirements, contact_info, status, position, created_at
            "#
        )
        .bind(new.event_date_id)
        .bind(new.event_id)
        .bind(new.user_id)
        .bind(new.number_of_students)
        .bind(new.number_of_teachers)
        .bind(&new.special_requirements)
        .bind(&new.contact_info)
        .bind(new.position)
        .bind(Utc::now())
        .fetch_one(conn)
        .await?;

        Ok(entry)
    }

    pub async fn lock(conn: &mut PgConnection, id: i64) -> Result<Option<WaitingListEntry>, BookingError> {
        let entry = sqlx::query_as::<_, WaitingListEntry>(
            r#"
            SELECT id, event_date_id, event_id, user_id, number_of_students, number_of_teachers,
                   special_requirements, contact_info, status, position, created_at
            FROM waiting_list WHERE id = $1 FOR UPDATE
            "#
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(entry)
    }

    pub async fn save(conn: &mut PgConnection, entry: &WaitingListEntry) -> Result<WaitingListEntry, BookingError> {
        let saved = sqlx::query_as::<_, WaitingListEntry>(
            r#"
            UPDATE waiting_list
            SET number_of_students = $2,
                number_of_teachers = $3,
                special_requirements = $4,
                contact_info = $5,
                status = $6,
                position = $7
            WHERE id = $1
            RETURNING id, event_date_id, event_id, user_id, number_of_students, number_of_teachers,
                      special_requirements, contact_info, status, position, created_at
            "#
        )
        .bind(entry.id)
        .bind(entry.number_of_students)
        .bind(entry.number_of_teachers)
        .bind(&entry.special_requirements)
        .bind(&entry.contact_info)
        .bind(entry.status)
        .bind(entry.position)
        .fetch_optional(conn)
        .await?;

        saved.ok_or(BookingError::WaitingListEntryNotFound { entry_id: entry.id })
    }

    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<(), BookingError> {
        let result = sqlx::query("DELETE FROM waiting_list WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(BookingError::WaitingListEntryNotFound { entry_id: id });
        }
        Ok(())
    }

    /// WAITING entries in queue order, row-locked
    pub async fn lock_queue(conn: &mut PgConnection, event_date_id: i64) -> Result<Vec<WaitingListEntry>, BookingError> {
        let entries = sqlx::query_as::<_, WaitingListEntry>(
            r#"
            SELECT id, event_date_id, event_id, user_id, number_of_students, number_of_teachers,
                   special_requirements, contact_info, status, position, created_at
            FROM waiting_list
            WHERE event_date_id = $1 AND status = 'waiting'
            ORDER BY position ASC, id ASC
            FOR UPDATE
            "#
        )
        .bind(event_date_id)
        .fetch_all(conn)
        .await?;

        Ok(entries)
    }

    pub async fn shift_after(conn: &mut PgConnection, event_date_id: i64, position: i32) -> Result<u64, BookingError> {
        let result = sqlx::query(
            "UPDATE waiting_list SET position = position - 1 WHERE event_date_id = $1 AND status = 'waiting' AND position > $2"
        )
        .bind(event_date_id)
        .bind(position)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn compact(conn: &mut PgConnection, event_date_id: i64) -> Result<u64, BookingError> {
        let result = sqlx::query(
            r#"
            UPDATE waiting_list AS w
            SET position = ranked.new_position
            FROM (
                SELECT id, ROW_NUMBER() OVER (ORDER BY position ASC, id ASC) AS new_position
                FROM waiting_list
                WHERE event_date_id = $1 AND status = 'waiting'
            ) AS ranked
            WHERE w.id = ranked.id AND w.position <> ranked.new_position
            "#
        )
        .bind(event_date_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}
