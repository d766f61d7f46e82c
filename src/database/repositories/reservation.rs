//! Reservation repository implementation

use chrono::Utc;
use sqlx::{PgConnection, PgPool};

use crate::models::reservation::{NewReservation, Reservation};
use crate::query::{sql, ListQuery};
use crate::utils::errors::BookingError;

#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find reservation by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>, BookingError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, event_id, event_date_id, user_id, number_of_students, number_of_teachers, total_seats,
                   special_requirements, contact_info, status, local_reservation_code, created_at, updated_at, cancelled_at
            FROM reservation WHERE id = $1
            "#
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reservation)
    }

    /// Find reservation by its local code
    pub async fn find_by_code(&self, code: &str) -> Result<Option<Reservation>, BookingError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, event_id, event_date_id, user_id, number_of_students, number_of_teachers, total_seats,
                   special_requirements, contact_info, status, local_reservation_code, created_at, updated_at, cancelled_at
            FROM reservation WHERE local_reservation_code = $1
            "#
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reservation)
    }

    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<Reservation>, u64), BookingError> {
        sql::fetch_page(&self.pool, query).await
    }

    pub async fn code_exists(conn: &mut PgConnection, code: &str) -> Result<bool, BookingError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reservation WHERE local_reservation_code = $1)"
        )
        .bind(code)
        .fetch_one(conn)
        .await?;

        Ok(exists)
    }

    /// Insert a reservation whose seats were already taken from the ledger
    pub async fn insert(conn: &mut PgConnection, new: &NewReservation) -> Result<Reservation, BookingError> {
        let now = Utc::now();
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservation (event_id, event_date_id, user_id, number_of_students, number_of_teachers, total_seats,
                                     special_requirements, contact_info, status, local_reservation_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING id, event_id, event_date_id, user_id, number_of_students, number_of_teachers, total_seats,
                      special_requirements, contact_info, status, local_reservation_code, created_at, updated_at, cancelled_at
            "#
        )
        .bind(new.event_id)
        .bind(new.event_date_id)
        .bind(new.user_id)
        .bind(new.number_of_students)
        .bind(new.number_of_teachers)
        .bind(new.total_seats())
        .bind(&new.special_requirements)
        .bind(&new.contact_info)
        .bind(new.status)
        .bind(&new.local_reservation_code)
        .bind(now)
        .fetch_one(conn)
        .await?;

        Ok(reservation)
    }

    /// Read a reservation and hold its row lock for the rest of the transaction
    pub async fn lock(conn: &mut PgConnection, id: i64) -> Result<Option<Reservation>, BookingError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, event_id, event_date_id, user_id, number_of_students, number_of_teachers, total_seats,
                   special_requirements, contact_info, status, local_reservation_code, created_at, updated_at, cancelled_at
            FROM reservation WHERE id = $1 FOR UPDATE
            "#
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(reservation)
    }

    /// Update every mutable column
    pub async fn save(conn: &mut PgConnection, reservation: &Reservation) -> Result<Reservation, BookingError> {
        let saved = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservation
            SET event_date_id = $2,
                number_of_students = $3,
                number_of_teachers = $4,
                total_seats = $5,
                special_requirements = $6,
                contact_info = $7,
                status = $8,
                cancelled_at = $9,
                updated_at = $10
            WHERE id = $1
            RETURNING id, event_id, event_date_id, user_id, number_of_students, number_of_teachers, total_seats,
                      special_requirements, contact_info, status, local_reservation_code, created_at, updated_at, cancelled_at
            "#
        )
        .bind(reservation.id)
        .bind(reservation.event_date_id)
        .bind(reservation.number_of_students)
        .bind(reservation.number_of_teachers)
        .bind(reservation.total_seats)
        .bind(&reservation.special_requirements)
        .bind(&reservation.contact_info)
        .bind(reservation.status)
        .bind(reservation.cancelled_at)
        .bind(Utc::now())
        .fetch_optional(conn)
        .await?;

        saved.ok_or_else(|| BookingError::ReservationNotFound { reservation: reservation.id.to_string() })
    }
}
