//! Test data helpers
//!
//! Request builders with sensible defaults and a notifier that records what
//! it was asked to deliver.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use seatkeeper::models::{
    CreateReservationRequest, CreateWaitingListRequest, EventDate, UpdateReservationRequest, UpdateWaitingListRequest,
};
use seatkeeper::services::Notifier;

pub const TEST_USER_ID: i64 = 1001;
pub const TEST_CONTACT_INFO: &str = "Jana Novak, +421 900 123 456";

/// Reservation request for `students + teachers` seats on `event_date`
pub fn reservation_request(event_date: &EventDate, students: i32, teachers: i32) -> CreateReservationRequest {
    CreateReservationRequest {
        event_id: event_date.event_id,
        event_date_id: event_date.id,
        user_id: TEST_USER_ID,
        number_of_students: students,
        number_of_teachers: teachers,
        contact_info: TEST_CONTACT_INFO.to_string(),
        special_requirements: None,
    }
}

/// Waiting list request for `students + teachers` seats on `event_date`
pub fn waiting_request(event_date: &EventDate, students: i32, teachers: i32) -> CreateWaitingListRequest {
    CreateWaitingListRequest {
        event_date_id: event_date.id,
        user_id: TEST_USER_ID,
        number_of_students: students,
        number_of_teachers: teachers,
        contact_info: TEST_CONTACT_INFO.to_string(),
        special_requirements: None,
    }
}

pub fn seats_update(students: i32, teachers: i32) -> UpdateReservationRequest {
    UpdateReservationRequest {
        number_of_students: Some(students),
        number_of_teachers: Some(teachers),
        ..Default::default()
    }
}

pub fn move_update(event_date_id: i64) -> UpdateReservationRequest {
    UpdateReservationRequest {
        event_date_id: Some(event_date_id),
        ..Default::default()
    }
}

pub fn waiting_seats_update(students: i32, teachers: i32) -> UpdateWaitingListRequest {
    UpdateWaitingListRequest {
        number_of_students: Some(students),
        number_of_teachers: Some(teachers),
        ..Default::default()
    }
}

/// What a [`RecordingNotifier`] was handed
#[derive(Debug, Clone, PartialEq)]
pub enum Delivered {
    Message { user_id: i64, text: String },
    Email { template: String, data: Value },
}

/// Notifier that keeps every delivery in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<Delivered>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn messages_for(&self, user_id: i64) -> Vec<String> {
        self.delivered()
            .into_iter()
            .filter_map(|d| match d {
                Delivered::Message { user_id: to, text } if to == user_id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn emails(&self) -> Vec<(String, Value)> {
        self.delivered()
            .into_iter()
            .filter_map(|d| match d {
                Delivered::Email { template, data } => Some((template, data)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user_id: i64, message: &str) -> seatkeeper::Result<()> {
        self.delivered.lock().unwrap().push(Delivered::Message { user_id, text: message.to_string() });
        Ok(())
    }

    async fn send_email(&self, template: &str, data: &Value) -> seatkeeper::Result<()> {
        self.delivered.lock().unwrap().push(Delivered::Email { template: template.to_string(), data: data.clone() });
        Ok(())
    }
}
