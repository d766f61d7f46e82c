//! Waiting list queueing and promotion

mod helpers;

use assert_matches::assert_matches;

use helpers::*;
use seatkeeper::models::{ReservationStatus, UpdateWaitingListRequest, WaitingListStatus};
use seatkeeper::query::{Filter, ListQuery, Sort};
use seatkeeper::services::ProcessingPolicy;
use seatkeeper::BookingError;

/// `(entry id, position)` of the WAITING entries in queue order
async fn queue(ctx: &TestContext, event_date_id: i64) -> Vec<(i64, i32)> {
    let query = ListQuery::new(1, 100)
        .filter(Filter::equals("status", WaitingListStatus::Waiting))
        .sort_by(Sort::asc("position"));
    ctx.services
        .waiting_list
        .list_by_event_date(event_date_id, &query)
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|entry| (entry.id, entry.position))
        .collect()
}

fn assert_compact(queue: &[(i64, i32)]) {
    let positions: Vec<i32> = queue.iter().map(|(_, position)| *position).collect();
    let expected: Vec<i32> = (1..=queue.len() as i32).collect();
    assert_eq!(positions, expected);
}

#[tokio::test]
async fn test_add_appends_to_the_tail() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    ctx.set_available_spots(date.id, 0).await;

    let first = ctx.services.waiting_list.add(waiting_request(&date, 3, 1)).await.unwrap();
    let second = ctx.services.waiting_list.add(waiting_request(&date, 2, 0)).await.unwrap();
    let third = ctx.services.waiting_list.add(waiting_request(&date, 5, 0)).await.unwrap();

    assert_eq!((first.position, second.position, third.position), (1, 2, 3));
    assert_eq!(first.status, WaitingListStatus::Waiting);
    assert_eq!(first.event_id, date.event_id);
    assert_eq!(ctx.available_spots(date.id).await, 0);
}

#[tokio::test]
async fn test_add_validation() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;

    let too_big = ctx.services.waiting_list.add(waiting_request(&date, 10, 1)).await;
    assert_matches!(too_big, Err(BookingError::InvalidSeatCount { requested: 11, capacity: 10 }));

    let empty = ctx.services.waiting_list.add(waiting_request(&date, 0, 0)).await;
    assert_matches!(empty, Err(BookingError::InvalidInput(_)));

    let mut request = waiting_request(&date, 1, 0);
    request.event_date_id = 9999;
    let unknown = ctx.services.waiting_list.add(request).await;
    assert_matches!(unknown, Err(BookingError::EventDateNotFound { event_date_id: 9999 }));

    ctx.lock(date.id).await;
    let locked = ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await;
    assert_matches!(locked, Err(BookingError::Locked { .. }));
}

#[tokio::test]
async fn test_strict_fifo_stops_at_first_misfit() {
    let ctx = TestContext::with_policy(ProcessingPolicy::StrictFifo).await;
    let date = ctx.create_event_date(10).await;
    ctx.set_available_spots(date.id, 0).await;

    let a = ctx.services.waiting_list.add(waiting_request(&date, 4, 0)).await.unwrap();
    let b = ctx.services.waiting_list.add(waiting_request(&date, 8, 0)).await.unwrap();
    let c = ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap();

    ctx.set_available_spots(date.id, 5).await;
    let promoted = ctx.services.waiting_list.process(date.id).await.unwrap();

    assert_eq!(promoted, 1);
    assert_eq!(ctx.available_spots(date.id).await, 1);
    assert_eq!(ctx.services.waiting_list.get(a.id).await.unwrap().status, WaitingListStatus::Processed);
    assert_eq!(queue(&ctx, date.id).await, vec![(b.id, 1), (c.id, 2)]);
}

#[tokio::test]
async fn test_strict_fifo_does_not_skip_the_head() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    ctx.set_available_spots(date.id, 0).await;

    let a = ctx.services.waiting_list.add(waiting_request(&date, 3, 0)).await.unwrap();
    let b = ctx.services.waiting_list.add(waiting_request(&date, 2, 0)).await.unwrap();
    let c = ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap();

    ctx.set_available_spots(date.id, 2).await;

    assert_eq!(ctx.services.waiting_list.process(date.id).await.unwrap(), 0);
    assert_eq!(ctx.available_spots(date.id).await, 2);
    assert_eq!(queue(&ctx, date.id).await, vec![(a.id, 1), (b.id, 2), (c.id, 3)]);
}

#[tokio::test]
async fn test_best_fit_skips_entries_that_do_not_fit() {
    let ctx = TestContext::with_policy(ProcessingPolicy::BestFit).await;
    let date = ctx.create_event_date(10).await;
    ctx.set_available_spots(date.id, 0).await;

    let a = ctx.services.waiting_list.add(waiting_request(&date, 4, 0)).await.unwrap();
    let b = ctx.services.waiting_list.add(waiting_request(&date, 8, 0)).await.unwrap();
    let c = ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap();

    ctx.set_available_spots(date.id, 5).await;
    let promoted = ctx.services.waiting_list.process(date.id).await.unwrap();

    assert_eq!(promoted, 2);
    assert_eq!(ctx.available_spots(date.id).await, 0);
    assert_eq!(ctx.services.waiting_list.get(a.id).await.unwrap().status, WaitingListStatus::Processed);
    assert_eq!(ctx.services.waiting_list.get(c.id).await.unwrap().status, WaitingListStatus::Processed);
    assert_eq!(queue(&ctx, date.id).await, vec![(b.id, 1)]);
}

#[tokio::test]
async fn test_promotion_creates_confirmed_reservation() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    ctx.set_available_spots(date.id, 0).await;

    let mut request = waiting_request(&date, 3, 1);
    request.user_id = 55;
    request.special_requirements = Some("wheelchair access".to_string());
    ctx.services.waiting_list.add(request).await.unwrap();

    ctx.set_available_spots(date.id, 4).await;
    assert_eq!(ctx.services.waiting_list.process(date.id).await.unwrap(), 1);

    let reservations = ctx.services.reservations.list_by_user(55, &ListQuery::default()).await.unwrap();
    assert_eq!(reservations.total_items, 1);
    let reservation = &reservations.items[0];
    assert_eq!(reservation.status, ReservationStatus::Confirmed);
    assert_eq!(reservation.total_seats, 4);
    assert_eq!(reservation.event_date_id, date.id);
    assert_eq!(reservation.special_requirements.as_deref(), Some("wheelchair access"));
    assert_eq!(reservation.contact_info, TEST_CONTACT_INFO);
}

#[tokio::test]
async fn test_process_is_idempotent() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    ctx.set_available_spots(date.id, 0).await;
    ctx.services.waiting_list.add(waiting_request(&date, 2, 0)).await.unwrap();
    ctx.services.waiting_list.add(waiting_request(&date, 6, 0)).await.unwrap();

    ctx.set_available_spots(date.id, 3).await;
    assert_eq!(ctx.services.waiting_list.process(date.id).await.unwrap(), 1);
    let after_first = queue(&ctx, date.id).await;

    assert_eq!(ctx.services.waiting_list.process(date.id).await.unwrap(), 0);
    assert_eq!(queue(&ctx, date.id).await, after_first);
    assert_eq!(ctx.available_spots(date.id).await, 1);
}

#[tokio::test]
async fn test_process_empty_queue_and_unknown_date() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;

    assert_eq!(ctx.services.waiting_list.process(date.id).await.unwrap(), 0);
    assert_matches!(
        ctx.services.waiting_list.process(9999).await,
        Err(BookingError::EventDateNotFound { event_date_id: 9999 })
    );
}

#[tokio::test]
async fn test_process_refuses_locked_date() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    ctx.set_available_spots(date.id, 0).await;
    let entry = ctx.services.waiting_list.add(waiting_request(&date, 2, 0)).await.unwrap();

    ctx.set_available_spots(date.id, 10).await;
    ctx.lock(date.id).await;

    assert_matches!(ctx.services.waiting_list.process(date.id).await, Err(BookingError::Locked { .. }));
    assert_eq!(ctx.services.waiting_list.get(entry.id).await.unwrap().status, WaitingListStatus::Waiting);
    assert_eq!(ctx.available_spots(date.id).await, 10);
}

#[tokio::test]
async fn test_cancel_then_process_scenario() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(20).await;

    let school_a = ctx.services.reservations.create(reservation_request(&date, 12, 2)).await.unwrap();
    ctx.services.reservations.create(reservation_request(&date, 5, 1)).await.unwrap();
    assert_eq!(ctx.available_spots(date.id).await, 0);

    let waiting = ctx.services.waiting_list.add(waiting_request(&date, 9, 1)).await.unwrap();
    assert_eq!(waiting.position, 1);

    ctx.services.reservations.cancel(school_a.id).await.unwrap();
    assert_eq!(ctx.available_spots(date.id).await, 14);

    assert_eq!(ctx.services.waiting_list.process(date.id).await.unwrap(), 1);
    assert_eq!(ctx.available_spots(date.id).await, 4);
    assert!(queue(&ctx, date.id).await.is_empty());
}

#[tokio::test]
async fn test_full_date_overflow_scenario() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;

    let first = ctx.services.reservations.create(reservation_request(&date, 4, 2)).await.unwrap();
    assert_eq!(ctx.available_spots(date.id).await, 4);

    let refused = ctx.services.reservations.create(reservation_request(&date, 5, 0)).await;
    assert_matches!(refused, Err(BookingError::InsufficientCapacity { .. }));
    assert_eq!(ctx.available_spots(date.id).await, 4);

    let entry = ctx.services.waiting_list.add(waiting_request(&date, 5, 0)).await.unwrap();
    assert_eq!(entry.position, 1);

    ctx.services.reservations.cancel(first.id).await.unwrap();
    assert_eq!(ctx.available_spots(date.id).await, 10);

    assert_eq!(ctx.services.waiting_list.process(date.id).await.unwrap(), 1);
    assert_eq!(ctx.available_spots(date.id).await, 5);
    assert_eq!(ctx.services.waiting_list.get(entry.id).await.unwrap().status, WaitingListStatus::Processed);
}

#[tokio::test]
async fn test_delete_closes_the_gap() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    let ids: Vec<i64> = {
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap().id);
        }
        ids
    };

    ctx.services.waiting_list.delete(ids[1]).await.unwrap();

    assert_eq!(queue(&ctx, date.id).await, vec![(ids[0], 1), (ids[2], 2), (ids[3], 3)]);
    assert_matches!(
        ctx.services.waiting_list.get(ids[1]).await,
        Err(BookingError::WaitingListEntryNotFound { .. })
    );
    assert_matches!(
        ctx.services.waiting_list.delete(ids[1]).await,
        Err(BookingError::WaitingListEntryNotFound { .. })
    );
}

#[tokio::test]
async fn test_status_changes_compact_the_queue() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    let a = ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap();
    let b = ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap();
    let c = ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap();

    let cancelled = ctx.services.waiting_list.update_status(a.id, WaitingListStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, WaitingListStatus::Cancelled);
    assert_eq!(queue(&ctx, date.id).await, vec![(b.id, 1), (c.id, 2)]);

    let back = ctx.services.waiting_list.update_status(a.id, WaitingListStatus::Waiting).await;
    assert_matches!(back, Err(BookingError::InvalidStateTransition { .. }));

    let same = ctx.services.waiting_list.update_status(b.id, WaitingListStatus::Waiting).await.unwrap();
    assert_eq!(same.position, 1);
}

#[tokio::test]
async fn test_update_entry_fields() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    let entry = ctx.services.waiting_list.add(waiting_request(&date, 2, 1)).await.unwrap();

    let updated = ctx.services.waiting_list.update(entry.id, waiting_seats_update(6, 2)).await.unwrap();
    assert_eq!(updated.total_seats(), 8);
    assert_eq!(updated.position, 1);

    let too_big = ctx.services.waiting_list.update(entry.id, waiting_seats_update(9, 2)).await;
    assert_matches!(too_big, Err(BookingError::InvalidSeatCount { requested: 11, capacity: 10 }));

    let request = UpdateWaitingListRequest {
        contact_info: Some("  new   contact ".to_string()),
        status: Some(WaitingListStatus::Cancelled),
        ..Default::default()
    };
    let cancelled = ctx.services.waiting_list.update(entry.id, request).await.unwrap();
    assert_eq!(cancelled.contact_info, "new contact");
    assert_eq!(cancelled.status, WaitingListStatus::Cancelled);
    assert!(queue(&ctx, date.id).await.is_empty());
}

#[tokio::test]
async fn test_locked_date_freezes_the_queue() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    let entry = ctx.services.waiting_list.add(waiting_request(&date, 2, 0)).await.unwrap();

    ctx.lock(date.id).await;

    assert_matches!(
        ctx.services.waiting_list.update(entry.id, waiting_seats_update(3, 0)).await,
        Err(BookingError::Locked { .. })
    );
    assert_matches!(
        ctx.services.waiting_list.update_status(entry.id, WaitingListStatus::Cancelled).await,
        Err(BookingError::Locked { .. })
    );
    assert_matches!(ctx.services.waiting_list.delete(entry.id).await, Err(BookingError::Locked { .. }));

    assert_eq!(ctx.services.waiting_list.reorder(date.id).await.unwrap(), 0);
    assert_eq!(ctx.services.waiting_list.get(entry.id).await.unwrap().status, WaitingListStatus::Waiting);
}

#[tokio::test]
async fn test_reorder_is_a_no_op_on_a_compact_queue() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    for _ in 0..3 {
        ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap();
    }

    let before = queue(&ctx, date.id).await;
    assert_eq!(ctx.services.waiting_list.reorder(date.id).await.unwrap(), 0);
    assert_eq!(queue(&ctx, date.id).await, before);
    assert_compact(&before);
}

#[tokio::test]
async fn test_positions_stay_dense_through_mixed_operations() {
    let ctx = TestContext::with_policy(ProcessingPolicy::BestFit).await;
    let date = ctx.create_event_date(10).await;
    ctx.set_available_spots(date.id, 0).await;

    let mut ids = Vec::new();
    for seats in [3, 7, 1, 2, 9, 1] {
        ids.push(ctx.services.waiting_list.add(waiting_request(&date, seats, 0)).await.unwrap().id);
    }
    assert_compact(&queue(&ctx, date.id).await);

    ctx.services.waiting_list.delete(ids[0]).await.unwrap();
    assert_compact(&queue(&ctx, date.id).await);

    ctx.services.waiting_list.update_status(ids[3], WaitingListStatus::Cancelled).await.unwrap();
    assert_compact(&queue(&ctx, date.id).await);

    ctx.set_available_spots(date.id, 2).await;
    ctx.services.waiting_list.process(date.id).await.unwrap();
    let remaining = queue(&ctx, date.id).await;
    assert_compact(&remaining);

    let order: Vec<i64> = remaining.iter().map(|(id, _)| *id).collect();
    assert_eq!(order, vec![ids[1], ids[4]]);
}

#[tokio::test]
async fn test_list_scopes() {
    let ctx = TestContext::new().await;
    let date = ctx.create_event_date(10).await;
    let other = ctx.create_event_date(10).await;
    ctx.services.waiting_list.add(waiting_request(&date, 1, 0)).await.unwrap();
    let mut request = waiting_request(&other, 1, 0);
    request.user_id = 77;
    ctx.services.waiting_list.add(request).await.unwrap();

    let query = ListQuery::default();
    assert_eq!(ctx.services.waiting_list.list(&query).await.unwrap().total_items, 2);
    assert_eq!(ctx.services.waiting_list.list_by_user(77, &query).await.unwrap().total_items, 1);
    assert_eq!(ctx.services.waiting_list.list_by_event_date(date.id, &query).await.unwrap().total_items, 1);
    assert_matches!(
        ctx.services.waiting_list.list_by_event_date(9999, &query).await,
        Err(BookingError::EventDateNotFound { .. })
    );
}
