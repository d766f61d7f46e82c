//! Waiting list manager
//!
//! Keeps one ordered queue of WAITING entries per event date with dense
//! positions `1..N`, and promotes entries into CONFIRMED reservations when the
//! ledger has room. Mutations lock the event date before the entry, so every
//! change to a queue is serialized on its event date row.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::database::{BookingStore, BookingTx};
use crate::models::reservation::seat_total;
use crate::models::{
    CreateWaitingListRequest, EventDate, NewReservation, NewWaitingListEntry, Paginated, Reservation,
    ReservationStatus, UpdateWaitingListRequest, WaitingListEntry, WaitingListStatus,
};
use crate::query::{Filter, ListQuery, Sort};
use crate::services::ledger::{ensure_unlocked, lock_event_date};
use crate::services::notification::NotificationService;
use crate::services::reservation::{insert_reservation, unique_reservation_code, DEFAULT_CODE_GENERATION_ATTEMPTS};
use crate::utils::errors::{BookingError, Result};
use crate::utils::helpers::{optional_text, required_contact_info};
use crate::utils::logging::{log_reservation_action, log_waiting_list_action};

/// How `process` treats an entry that does not fit the free seats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingPolicy {
    /// Stop at the first entry that does not fit
    #[default]
    StrictFifo,
    /// Skip entries that do not fit and keep scanning in position order
    BestFit,
}

impl std::fmt::Display for ProcessingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingPolicy::StrictFifo => write!(f, "strict_fifo"),
            ProcessingPolicy::BestFit => write!(f, "best_fit"),
        }
    }
}

/// Waiting list manager
#[derive(Clone)]
pub struct WaitingListManager {
    store: Arc<dyn BookingStore>,
    notifications: NotificationService,
    policy: ProcessingPolicy,
    code_attempts: u32,
}

impl WaitingListManager {
    pub fn new(store: Arc<dyn BookingStore>, notifications: NotificationService) -> Self {
        Self {
            store,
            notifications,
            policy: ProcessingPolicy::default(),
            code_attempts: DEFAULT_CODE_GENERATION_ATTEMPTS,
        }
    }

    pub fn with_policy(mut self, policy: ProcessingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_code_attempts(mut self, attempts: u32) -> Self {
        self.code_attempts = attempts.max(1);
        self
    }

    pub fn policy(&self) -> ProcessingPolicy {
        self.policy
    }

    /// Append an entry at the tail of the event date's queue
    #[instrument(skip(self, request), fields(event_date_id = request.event_date_id, user_id = request.user_id))]
    pub async fn add(&self, request: CreateWaitingListRequest) -> Result<WaitingListEntry> {
        debug!("Adding waiting list entry");

        let seats = seat_total(request.number_of_students, request.number_of_teachers)?;
        let contact_info = required_contact_info(&request.contact_info)?;

        let mut tx = self.store.begin().await?;
        let event_date = lock_event_date(tx.as_mut(), request.event_date_id).await?;
        ensure_unlocked(&event_date)?;
        ensure_fits_capacity(&event_date, seats)?;

        // The date row lock serializes concurrent tail inserts
        let position = tx.max_waiting_position(event_date.id).await? + 1;

        let entry = tx
            .insert_waiting_entry(&NewWaitingListEntry {
                event_date_id: event_date.id,
                event_id: event_date.event_id,
                user_id: request.user_id,
                number_of_students: request.number_of_students,
                number_of_teachers: request.number_of_teachers,
                special_requirements: optional_text(request.special_requirements.as_deref()),
                contact_info,
                position,
            })
            .await?;
        tx.commit().await?;

        log_waiting_list_action(entry.id, "added", entry.event_date_id, Some(entry.position));
        info!(entry_id = entry.id, position, seats, "Waiting list entry added");

        self.notifications.waiting_list_added(&entry);
        Ok(entry)
    }

    /// Partial update; the queue is compacted when the entry enters or leaves WAITING
    #[instrument(skip(self, request))]
    pub async fn update(&self, entry_id: i64, request: UpdateWaitingListRequest) -> Result<WaitingListEntry> {
        debug!("Updating waiting list entry");

        let (mut tx, event_date, mut entry) = self.lock_entry(entry_id).await?;
        ensure_unlocked(&event_date)?;

        if request.number_of_students.is_some() || request.number_of_teachers.is_some() {
            let number_of_students = request.number_of_students.unwrap_or(entry.number_of_students);
            let number_of_teachers = request.number_of_teachers.unwrap_or(entry.number_of_teachers);
            let seats = seat_total(number_of_students, number_of_teachers)?;
            ensure_fits_capacity(&event_date, seats)?;

            entry.number_of_students = number_of_students;
            entry.number_of_teachers = number_of_teachers;
        }
        if let Some(contact_info) = request.contact_info.as_deref() {
            entry.contact_info = required_contact_info(contact_info)?;
        }
        if let Some(special_requirements) = request.special_requirements.as_deref() {
            entry.special_requirements = optional_text(Some(special_requirements));
        }

        let reorder = match request.status {
            Some(status) => change_status(&mut entry, status)?,
            None => false,
        };

        let entry = tx.save_waiting_entry(&entry).await?;
        if reorder {
            tx.compact_waiting_positions(entry.event_date_id).await?;
        }
        tx.commit().await?;

        log_waiting_list_action(entry_id, "updated", entry.event_date_id, Some(entry.position));
        Ok(entry)
    }

    /// Move an entry to `status`, compacting the queue when WAITING is involved
    #[instrument(skip(self))]
    pub async fn update_status(&self, entry_id: i64, status: WaitingListStatus) -> Result<WaitingListEntry> {
        debug!("Changing waiting list entry status");

        let (mut tx, event_date, mut entry) = self.lock_entry(entry_id).await?;
        ensure_unlocked(&event_date)?;

        let previous = entry.status;
        let reorder = change_status(&mut entry, status)?;

        let entry = tx.save_waiting_entry(&entry).await?;
        if reorder {
            tx.compact_waiting_positions(entry.event_date_id).await?;
        }
        tx.commit().await?;

        log_waiting_list_action(entry_id, entry.status.as_str(), entry.event_date_id, Some(entry.position));
        info!(entry_id, from = %previous, to = %entry.status, "Waiting list entry status changed");
        Ok(entry)
    }

    /// Remove an entry and close the gap it leaves in the queue
    #[instrument(skip(self))]
    pub async fn delete(&self, entry_id: i64) -> Result<()> {
        debug!("Deleting waiting list entry");

        let (mut tx, event_date, entry) = self.lock_entry(entry_id).await?;
        ensure_unlocked(&event_date)?;

        tx.delete_waiting_entry(entry_id).await?;
        let shifted = if entry.status == WaitingListStatus::Waiting {
            tx.shift_waiting_positions(entry.event_date_id, entry.position).await?
        } else {
            0
        };
        tx.commit().await?;

        log_waiting_list_action(entry_id, "deleted", entry.event_date_id, Some(entry.position));
        debug!(entry_id, shifted, "Positions shifted after delete");
        Ok(())
    }

    /// Renumber the WAITING entries of a date as `1..N`; safe to call redundantly
    #[instrument(skip(self))]
    pub async fn reorder(&self, event_date_id: i64) -> Result<u64> {
        let mut tx = self.store.begin().await?;
        lock_event_date(tx.as_mut(), event_date_id).await?;
        let moved = tx.compact_waiting_positions(event_date_id).await?;
        tx.commit().await?;

        debug!(moved, "Waiting list reordered");
        Ok(moved)
    }

    /// Promote WAITING entries into CONFIRMED reservations while seats remain
    ///
    /// The event date stays locked for the whole scan. Returns the number of
    /// entries promoted.
    #[instrument(skip(self), fields(policy = %self.policy))]
    pub async fn process(&self, event_date_id: i64) -> Result<usize> {
        debug!("Processing waiting list");

        let mut tx = self.store.begin().await?;
        let mut event_date = lock_event_date(tx.as_mut(), event_date_id).await?;
        ensure_unlocked(&event_date)?;

        let queue = tx.waiting_entries(event_date_id).await?;
        let mut promoted: Vec<(WaitingListEntry, Reservation)> = Vec::new();

        for mut entry in queue {
            let seats = entry.total_seats();
            if seats <= 0 || seats > event_date.available_spots {
                debug!(entry_id = entry.id, position = entry.position, seats, available = event_date.available_spots, "Entry does not fit");
                match self.policy {
                    ProcessingPolicy::StrictFifo => break,
                    ProcessingPolicy::BestFit => continue,
                }
            }

            let reservation = self.promote(tx.as_mut(), &mut event_date, &entry).await?;
            entry.transition(WaitingListStatus::Processed)?;
            let entry = tx.save_waiting_entry(&entry).await?;
            promoted.push((entry, reservation));
        }

        if promoted.is_empty() {
            tx.rollback().await?;
            debug!("Nothing to promote");
            return Ok(0);
        }

        tx.compact_waiting_positions(event_date_id).await?;
        tx.commit().await?;

        for (entry, reservation) in &promoted {
            log_waiting_list_action(entry.id, "processed", event_date_id, Some(entry.position));
            log_reservation_action(reservation.id, "promoted", event_date_id, reservation.total_seats);
            self.notifications.waiting_list_promoted(entry, reservation);
        }
        info!(promoted = promoted.len(), available = event_date.available_spots, "Waiting list processed");

        Ok(promoted.len())
    }

    pub async fn get(&self, entry_id: i64) -> Result<WaitingListEntry> {
        self.store
            .find_waiting_entry(entry_id)
            .await?
            .ok_or(BookingError::WaitingListEntryNotFound { entry_id })
    }

    /// The user's entry on one event date
    ///
    /// An entry still WAITING wins; otherwise the most recent one is returned.
    pub async fn get_by_event_date_and_user(&self, event_date_id: i64, user_id: i64) -> Result<WaitingListEntry> {
        if self.store.find_event_date(event_date_id).await?.is_none() {
            return Err(BookingError::EventDateNotFound { event_date_id });
        }

        let scope = ListQuery::new(1, 1)
            .filter(Filter::equals("event_date_id", event_date_id))
            .filter(Filter::equals("user_id", user_id));
        let waiting = scope
            .clone()
            .filter(Filter::equals("status", WaitingListStatus::Waiting))
            .sort_by(Sort::asc("position"));

        let (entries, _) = self.store.list_waiting_entries(&waiting).await?;
        let entries = if entries.is_empty() {
            self.store.list_waiting_entries(&scope.sort_by(Sort::desc("id"))).await?.0
        } else {
            entries
        };

        entries
            .into_iter()
            .next()
            .ok_or(BookingError::NoWaitingListEntry { event_date_id, user_id })
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Paginated<WaitingListEntry>> {
        let (items, total) = self.store.list_waiting_entries(query).await?;
        Ok(Paginated::new(items, total, query.page, query.page_size))
    }

    pub async fn list_by_user(&self, user_id: i64, query: &ListQuery) -> Result<Paginated<WaitingListEntry>> {
        self.list(&query.scoped(Filter::equals("user_id", user_id))).await
    }

    pub async fn list_by_event_date(&self, event_date_id: i64, query: &ListQuery) -> Result<Paginated<WaitingListEntry>> {
        if self.store.find_event_date(event_date_id).await?.is_none() {
            return Err(BookingError::EventDateNotFound { event_date_id });
        }
        self.list(&query.scoped(Filter::equals("event_date_id", event_date_id))).await
    }

    /// Open a transaction holding the entry's event date lock and then the entry
    async fn lock_entry(&self, entry_id: i64) -> Result<(Box<dyn BookingTx>, EventDate, WaitingListEntry)> {
        let event_date_id = self.get(entry_id).await?.event_date_id;

        let mut tx = self.store.begin().await?;
        let event_date = lock_event_date(tx.as_mut(), event_date_id).await?;
        let entry = tx
            .lock_waiting_entry(entry_id)
            .await?
            .ok_or(BookingError::WaitingListEntryNotFound { entry_id })?;

        Ok((tx, event_date, entry))
    }

    async fn promote(&self, tx: &mut dyn BookingTx, event_date: &mut EventDate, entry: &WaitingListEntry) -> Result<Reservation> {
        let code = unique_reservation_code(tx, self.code_attempts).await?;
        let reservation = NewReservation {
            event_id: entry.event_id,
            event_date_id: entry.event_date_id,
            user_id: entry.user_id,
            number_of_students: entry.number_of_students,
            number_of_teachers: entry.number_of_teachers,
            special_requirements: entry.special_requirements.clone(),
            contact_info: entry.contact_info.clone(),
            status: ReservationStatus::Confirmed,
            local_reservation_code: code,
        };

        insert_reservation(tx, event_date, &reservation).await
    }
}

/// Apply a status change, returning whether the queue needs compacting
fn change_status(entry: &mut WaitingListEntry, status: WaitingListStatus) -> Result<bool> {
    let previous = entry.status;
    entry.transition(status)?;
    Ok(previous != status && (previous == WaitingListStatus::Waiting || status == WaitingListStatus::Waiting))
}

fn ensure_fits_capacity(event_date: &EventDate, seats: i32) -> Result<()> {
    if seats > event_date.capacity {
        return Err(BookingError::InvalidSeatCount { requested: seats, capacity: event_date.capacity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryBookingStore;
    use crate::models::{CreateEventDateRequest, CreateEventRequest};
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, NaiveTime};

    async fn setup(capacity: i32) -> (Arc<InMemoryBookingStore>, WaitingListManager, i64) {
        let store = Arc::new(InMemoryBookingStore::new());
        let event = store.create_event(CreateEventRequest { title: "Opera".to_string() }).await.unwrap();
        let date = store
            .create_event_date(CreateEventDateRequest {
                event_id: event.id,
                date: NaiveDate::from_ymd_opt(2031, 9, 1).unwrap(),
                time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                capacity,
            })
            .await
            .unwrap();
        let manager = WaitingListManager::new(store.clone(), NotificationService::disabled("en"));
        (store, manager, date.id)
    }

    fn request(event_date_id: i64, students: i32) -> CreateWaitingListRequest {
        CreateWaitingListRequest {
            event_date_id,
            user_id: 5,
            number_of_students: students,
            number_of_teachers: 0,
            contact_info: "teacher@school.example".to_string(),
            special_requirements: None,
        }
    }

    async fn positions(manager: &WaitingListManager, event_date_id: i64) -> Vec<(i64, i32)> {
        let page = manager
            .list_by_event_date(event_date_id, &ListQuery::new(1, 100).filter(Filter::equals("status", WaitingListStatus::Waiting)))
            .await
            .unwrap();
        let mut positions: Vec<_> = page.items.iter().map(|e| (e.id, e.position)).collect();
        positions.sort_by_key(|(_, position)| *position);
        positions
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(ProcessingPolicy::default(), ProcessingPolicy::StrictFifo);
        assert_eq!(serde_json::to_string(&ProcessingPolicy::BestFit).unwrap(), "\"best_fit\"");
        assert_eq!(ProcessingPolicy::StrictFifo.to_string(), "strict_fifo");
    }

    #[tokio::test]
    async fn test_lookup_by_event_date_and_user() {
        let (_, manager, date_id) = setup(10).await;

        let first = manager.add(request(date_id, 2)).await.unwrap();
        let second = manager.add(request(date_id, 3)).await.unwrap();
        manager.update_status(first.id, WaitingListStatus::Cancelled).await.unwrap();
        assert_eq!(manager.get_by_event_date_and_user(date_id, 5).await.unwrap().id, second.id);

        manager.update_status(second.id, WaitingListStatus::Cancelled).await.unwrap();
        let latest = manager.get_by_event_date_and_user(date_id, 5).await.unwrap();
        assert_eq!((latest.id, latest.status), (second.id, WaitingListStatus::Cancelled));

        assert_matches!(
            manager.get_by_event_date_and_user(date_id, 6).await,
            Err(BookingError::NoWaitingListEntry { event_date_id, user_id: 6 }) if event_date_id == date_id
        );
        assert_matches!(
            manager.get_by_event_date_and_user(999, 5).await,
            Err(BookingError::EventDateNotFound { event_date_id: 999 })
        );
    }

    #[tokio::test]
    async fn test_add_appends_at_tail() {
        let (_, manager, date_id) = setup(10).await;

        let first = manager.add(request(date_id, 2)).await.unwrap();
        let second = manager.add(request(date_id, 3)).await.unwrap();
        assert_eq!(first.position, 1);
        assert_eq!(second.position, 2);
        assert_eq!(second.status, WaitingListStatus::Waiting);

        assert_matches!(manager.add(request(date_id, 11)).await, Err(BookingError::InvalidSeatCount { .. }));
        assert_matches!(manager.add(request(date_id, 0)).await, Err(BookingError::InvalidInput(_)));
        assert_matches!(manager.add(request(404, 1)).await, Err(BookingError::EventDateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_shifts_later_positions() {
        let (_, manager, date_id) = setup(10).await;
        let a = manager.add(request(date_id, 1)).await.unwrap();
        let b = manager.add(request(date_id, 1)).await.unwrap();
        let c = manager.add(request(date_id, 1)).await.unwrap();

        manager.delete(b.id).await.unwrap();
        assert_eq!(positions(&manager, date_id).await, vec![(a.id, 1), (c.id, 2)]);
        assert_matches!(manager.get(b.id).await, Err(BookingError::WaitingListEntryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_status_change_compacts_queue() {
        let (_, manager, date_id) = setup(10).await;
        let a = manager.add(request(date_id, 1)).await.unwrap();
        let b = manager.add(request(date_id, 1)).await.unwrap();

        let cancelled = manager.update_status(a.id, WaitingListStatus::Cancelled).await.unwrap();
        assert_eq!(cancelled.status, WaitingListStatus::Cancelled);
        assert_eq!(positions(&manager, date_id).await, vec![(b.id, 1)]);

        assert_matches!(
            manager.update_status(a.id, WaitingListStatus::Waiting).await,
            Err(BookingError::InvalidStateTransition { .. })
        );
    }

    #[tokio::test]
    async fn test_update_fields_keeps_position() {
        let (_, manager, date_id) = setup(10).await;
        manager.add(request(date_id, 1)).await.unwrap();
        let b = manager.add(request(date_id, 1)).await.unwrap();

        let updated = manager
            .update(
                b.id,
                UpdateWaitingListRequest {
                    number_of_teachers: Some(2),
                    special_requirements: Some("wheelchair access".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.position, 2);
        assert_eq!(updated.total_seats(), 3);
        assert_eq!(updated.special_requirements.as_deref(), Some("wheelchair access"));
    }

    #[tokio::test]
    async fn test_best_fit_skips_large_entry() {
        let (store, manager, date_id) = setup(10).await;
        let manager = manager.with_policy(ProcessingPolicy::BestFit);

        let large = manager.add(request(date_id, 8)).await.unwrap();
        let small = manager.add(request(date_id, 2)).await.unwrap();

        // Leave 3 seats free
        let mut tx = store.begin().await.unwrap();
        let mut date = tx.lock_event_date(date_id).await.unwrap().unwrap();
        date.available_spots = 3;
        tx.save_event_date(&date).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(manager.process(date_id).await.unwrap(), 1);
        assert_eq!(manager.get(small.id).await.unwrap().status, WaitingListStatus::Processed);
        assert_eq!(manager.get(large.id).await.unwrap().position, 1);
        assert_eq!(store.find_event_date(date_id).await.unwrap().unwrap().available_spots, 1);
    }

    #[tokio::test]
    async fn test_locked_date_rejects_mutations() {
        let (store, manager, date_id) = setup(10).await;
        let entry = manager.add(request(date_id, 1)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let mut date = tx.lock_event_date(date_id).await.unwrap().unwrap();
        date.locked = true;
        tx.save_event_date(&date).await.unwrap();
        tx.commit().await.unwrap();

        assert_matches!(manager.add(request(date_id, 1)).await, Err(BookingError::Locked { .. }));
        assert_matches!(manager.delete(entry.id).await, Err(BookingError::Locked { .. }));
        assert_matches!(manager.process(date_id).await, Err(BookingError::Locked { .. }));
        assert!(manager.get(entry.id).await.is_ok());
    }
}
