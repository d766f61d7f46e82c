//! Reservation manager
//!
//! Creates, updates, cancels and confirms reservations against the capacity
//! ledger. Each mutation is one unit of work: the reservation row is locked
//! first, then the event date(s) it touches in ascending id order, and the
//! seat change and the reservation write commit together. Notifications are
//! queued only after the commit.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::database::{BookingStore, BookingTx};
use crate::models::reservation::seat_total;
use crate::models::{
    CreateReservationRequest, EventDate, NewReservation, Paginated, Reservation, ReservationStatus,
    UpdateReservationRequest,
};
use crate::query::{Filter, ListQuery};
use crate::services::ledger::{ensure_unlocked, lock_event_date, lock_event_date_pair, return_seats, take_seats};
use crate::services::notification::NotificationService;
use crate::utils::errors::{BookingError, Result};
use crate::utils::helpers::{generate_reservation_code, is_valid_reservation_code, optional_text, required_contact_info};
use crate::utils::logging::log_reservation_action;

pub const DEFAULT_CODE_GENERATION_ATTEMPTS: u32 = 10;

/// Reservation manager
#[derive(Clone)]
pub struct ReservationManager {
    store: Arc<dyn BookingStore>,
    notifications: NotificationService,
    code_attempts: u32,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn BookingStore>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
            code_attempts: DEFAULT_CODE_GENERATION_ATTEMPTS,
        }
    }

    pub fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.code_attempts = attempts.max(1);
        self
    }

    /// Reserve seats on an event date; the reservation starts out PENDING
    #[instrument(skip(self, request), fields(event_date_id = request.event_date_id, user_id = request.user_id))]
    pub async fn create(&self, request: CreateReservationRequest) -> Result<Reservation> {
        debug!(event_id = request.event_id, "Creating reservation");

        let seats = seat_total(request.number_of_students, request.number_of_teachers)?;
        let contact_info = required_contact_info(&request.contact_info)?;

        let mut tx = self.store.begin().await?;

        if !tx.event_exists(request.event_id).await? {
            return Err(BookingError::EventNotFound { event_id: request.event_id });
        }

        let mut event_date = lock_event_date(tx.as_mut(), request.event_date_id).await?;
        if event_date.event_id != request.event_id {
            return Err(BookingError::EventDateNotFound { event_date_id: request.event_date_id });
        }
        ensure_unlocked(&event_date)?;

        let new_reservation = NewReservation {
            event_id: request.event_id,
            event_date_id: request.event_date_id,
            user_id: request.user_id,
            number_of_students: request.number_of_students,
            number_of_teachers: request.number_of_teachers,
            special_requirements: optional_text(request.special_requirements.as_deref()),
            contact_info,
            status: ReservationStatus::Pending,
            local_reservation_code: unique_reservation_code(tx.as_mut(), self.code_attempts).await?,
        };
        let reservation = insert_reservation(tx.as_mut(), &mut event_date, &new_reservation).await?;
        tx.commit().await?;

        log_reservation_action(reservation.id, "created", reservation.event_date_id, seats);
        info!(
            reservation_id = reservation.id,
            code = %reservation.local_reservation_code,
            available = event_date.available_spots,
            "Reservation created successfully"
        );

        self.notifications.reservation_created(&reservation);
        Ok(reservation)
    }

    /// Change seat counts, the event date or the free-text fields
    ///
    /// Seat deltas are reconciled inside the same transaction as the row
    /// update, so a failed booking on the new date leaves the old date as it was.
    #[instrument(skip(self, request))]
    pub async fn update(&self, reservation_id: i64, request: UpdateReservationRequest) -> Result<Reservation> {
        debug!("Updating reservation");

        let mut tx = self.store.begin().await?;
        let mut reservation = lock_reservation(tx.as_mut(), reservation_id).await?;
        if reservation.status == ReservationStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled { reservation_id });
        }

        let number_of_students = request.number_of_students.unwrap_or(reservation.number_of_students);
        let number_of_teachers = request.number_of_teachers.unwrap_or(reservation.number_of_teachers);
        let new_total = seat_total(number_of_students, number_of_teachers)?;
        let old_total = reservation.total_seats;

        let current_date_id = reservation.event_date_id;
        let target_date_id = request.event_date_id.unwrap_or(current_date_id);

        if target_date_id == current_date_id {
            let mut event_date = lock_event_date(tx.as_mut(), current_date_id).await?;
            ensure_unlocked(&event_date)?;
            adjust_seats(tx.as_mut(), &mut event_date, old_total, new_total).await?;
        } else {
            let (mut old_date, mut new_date) =
                lock_event_date_pair(tx.as_mut(), current_date_id, target_date_id).await?;
            if new_date.event_id != reservation.event_id {
                return Err(BookingError::EventDateNotFound { event_date_id: target_date_id });
            }
            ensure_unlocked(&old_date)?;
            ensure_unlocked(&new_date)?;

            // Book on the new date before giving anything back on the old one
            if !take_seats(tx.as_mut(), &mut new_date, new_total).await? {
                return Err(BookingError::InsufficientCapacity {
                    event_date_id: target_date_id,
                    requested: new_total,
                    available: new_date.available_spots,
                });
            }
            return_seats(tx.as_mut(), &mut old_date, old_total).await?;
            reservation.event_date_id = target_date_id;
        }

        reservation.number_of_students = number_of_students;
        reservation.number_of_teachers = number_of_teachers;
        reservation.total_seats = new_total;
        if let Some(contact_info) = request.contact_info.as_deref() {
            reservation.contact_info = required_contact_info(contact_info)?;
        }
        if let Some(special_requirements) = request.special_requirements.as_deref() {
            reservation.special_requirements = optional_text(Some(special_requirements));
        }

        let reservation = tx.save_reservation(&reservation).await?;
        tx.commit().await?;

        log_reservation_action(reservation_id, "updated", reservation.event_date_id, new_total);
        info!(
            reservation_id,
            from_event_date_id = current_date_id,
            to_event_date_id = reservation.event_date_id,
            old_total,
            new_total,
            "Reservation updated successfully"
        );
        Ok(reservation)
    }

    /// Release the reservation's seats and mark it CANCELLED
    #[instrument(skip(self))]
    pub async fn cancel(&self, reservation_id: i64) -> Result<Reservation> {
        debug!("Cancelling reservation");

        let mut tx = self.store.begin().await?;
        let mut reservation = lock_reservation(tx.as_mut(), reservation_id).await?;
        if reservation.status == ReservationStatus::Cancelled {
            return Err(BookingError::AlreadyCancelled { reservation_id });
        }

        let mut event_date = lock_event_date(tx.as_mut(), reservation.event_date_id).await?;
        let release = return_seats(tx.as_mut(), &mut event_date, reservation.total_seats).await?;

        reservation.status = ReservationStatus::Cancelled;
        reservation.cancelled_at = Some(Utc::now());
        let reservation = tx.save_reservation(&reservation).await?;
        tx.commit().await?;

        log_reservation_action(reservation_id, "cancelled", reservation.event_date_id, release.released);
        info!(reservation_id, available = event_date.available_spots, "Reservation cancelled successfully");

        self.notifications.reservation_cancelled(&reservation);
        Ok(reservation)
    }

    /// Mark a reservation CONFIRMED; its seats are already held
    #[instrument(skip(self))]
    pub async fn confirm(&self, reservation_id: i64) -> Result<Reservation> {
        debug!("Confirming reservation");

        let mut tx = self.store.begin().await?;
        let mut reservation = lock_reservation(tx.as_mut(), reservation_id).await?;

        match reservation.status {
            ReservationStatus::Confirmed => {
                tx.rollback().await?;
                debug!(reservation_id, "Reservation already confirmed");
                return Ok(reservation);
            }
            ReservationStatus::Cancelled => {
                return Err(BookingError::InvalidStateTransition {
                    from: ReservationStatus::Cancelled.to_string(),
                    to: ReservationStatus::Confirmed.to_string(),
                });
            }
            ReservationStatus::Pending | ReservationStatus::Created => {}
        }

        reservation.status = ReservationStatus::Confirmed;
        let reservation = tx.save_reservation(&reservation).await?;
        tx.commit().await?;

        log_reservation_action(reservation_id, "confirmed", reservation.event_date_id, reservation.total_seats);
        self.notifications.reservation_confirmed(&reservation);
        Ok(reservation)
    }

    pub async fn get(&self, reservation_id: i64) -> Result<Reservation> {
        self.store
            .find_reservation(reservation_id)
            .await?
            .ok_or_else(|| BookingError::ReservationNotFound { reservation: reservation_id.to_string() })
    }

    pub async fn get_by_code(&self, code: &str) -> Result<Reservation> {
        let code = code.trim().to_uppercase();
        if !is_valid_reservation_code(&code) {
            return Err(BookingError::InvalidInput(format!("Malformed reservation code: {}", code)));
        }

        let reservation = self.store.find_reservation_by_code(&code).await?;
        reservation.ok_or(BookingError::ReservationNotFound { reservation: code })
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Paginated<Reservation>> {
        let (items, total) = self.store.list_reservations(query).await?;
        Ok(Paginated::new(items, total, query.page, query.page_size))
    }

    pub async fn list_by_user(&self, user_id: i64, query: &ListQuery) -> Result<Paginated<Reservation>> {
        self.list(&query.scoped(Filter::equals("user_id", user_id))).await
    }

    pub async fn list_by_event(&self, event_id: i64, query: &ListQuery) -> Result<Paginated<Reservation>> {
        if self.store.find_event(event_id).await?.is_none() {
            return Err(BookingError::EventNotFound { event_id });
        }
        self.list(&query.scoped(Filter::equals("event_id", event_id))).await
    }

    pub async fn list_by_user_and_event(
        &self,
        user_id: i64,
        event_id: i64,
        query: &ListQuery,
    ) -> Result<Paginated<Reservation>> {
        let scoped = query
            .scoped(Filter::equals("user_id", user_id))
            .filter(Filter::equals("event_id", event_id));
        self.list(&scoped).await
    }

    pub async fn list_by_event_date(&self, event_date_id: i64, query: &ListQuery) -> Result<Paginated<Reservation>> {
        if self.store.find_event_date(event_date_id).await?.is_none() {
            return Err(BookingError::EventDateNotFound { event_date_id });
        }
        self.list(&query.scoped(Filter::equals("event_date_id", event_date_id))).await
    }
}

async fn lock_reservation(tx: &mut dyn BookingTx, reservation_id: i64) -> Result<Reservation> {
    tx.lock_reservation(reservation_id)
        .await?
        .ok_or_else(|| BookingError::ReservationNotFound { reservation: reservation_id.to_string() })
}

/// Book the positive delta or release the negative one on a single date
async fn adjust_seats(tx: &mut dyn BookingTx, event_date: &mut EventDate, old_total: i32, new_total: i32) -> Result<()> {
    if new_total > event_date.capacity {
        return Err(BookingError::InvalidSeatCount { requested: new_total, capacity: event_date.capacity });
    }

    let delta = new_total - old_total;
    if delta > 0 {
        if !take_seats(tx, event_date, delta).await? {
            return Err(BookingError::InsufficientCapacity {
                event_date_id: event_date.id,
                requested: delta,
                available: event_date.available_spots,
            });
        }
    } else if delta < 0 {
        return_seats(tx, event_date, -delta).await?;
    }
    Ok(())
}

/// Draw codes until one is unused inside this transaction
pub(crate) async fn unique_reservation_code(tx: &mut dyn BookingTx, attempts: u32) -> Result<String> {
    for attempt in 1..=attempts.max(1) {
        let code = generate_reservation_code();
        if !tx.reservation_code_exists(&code).await? {
            return Ok(code);
        }
        debug!(attempt, "Reservation code collision, drawing again");
    }

    Err(BookingError::Internal(format!(
        "Could not generate a unique reservation code in {} attempts",
        attempts
    )))
}

/// Take the seats from a locked event date and insert the reservation row
pub(crate) async fn insert_reservation(
    tx: &mut dyn BookingTx,
    event_date: &mut EventDate,
    reservation: &NewReservation,
) -> Result<Reservation> {
    let seats = reservation.total_seats();
    if !take_seats(tx, event_date, seats).await? {
        return Err(BookingError::InsufficientCapacity {
            event_date_id: event_date.id,
            requested: seats,
            available: event_date.available_spots,
        });
    }

    tx.insert_reservation(reservation).await
}
