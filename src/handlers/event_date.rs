//! Event date handlers: capacity, lock state and listing

use super::{messages, respond, ListParams};
use crate::models::{ApiResponse, EventDate, Paginated};
use crate::services::{CapacityLedger, IdentityProvider, ServiceFactory};
use crate::utils::helpers::retry_on_conflict;

#[derive(Clone)]
pub struct EventDateHandler {
    ledger: CapacityLedger,
    retry_attempts: u32,
}

impl EventDateHandler {
    pub fn new(services: &ServiceFactory, retry_attempts: u32) -> Self {
        Self {
            ledger: services.ledger.clone(),
            retry_attempts,
        }
    }

    pub async fn get(&self, identity: &dyn IdentityProvider, event_date_id: i64) -> ApiResponse<EventDate> {
        let result = async {
            identity.require_user_id()?;
            self.ledger.event_date(event_date_id).await
        }
        .await;

        respond(result, messages::EVENT_DATE_RETRIEVED, 200)
    }

    pub async fn list(&self, identity: &dyn IdentityProvider, params: &ListParams) -> ApiResponse<Paginated<EventDate>> {
        let result = async {
            identity.require_user_id()?;
            let query = params.to_query::<EventDate>()?;
            self.ledger.list(&query).await
        }
        .await;

        respond(result, messages::EVENT_DATES_RETRIEVED, 200)
    }

    /// Organizer freeze or unfreeze
    pub async fn set_locked(&self, identity: &dyn IdentityProvider, event_date_id: i64, locked: bool) -> ApiResponse<EventDate> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.ledger.set_locked(event_date_id, locked)).await
        }
        .await;

        respond(result, messages::EVENT_DATE_LOCK_UPDATED, 200)
    }

    /// Freeze the date `hours_before` its start, or the configured default
    pub async fn set_lock_time(
        &self,
        identity: &dyn IdentityProvider,
        event_date_id: i64,
        hours_before: Option<i64>,
    ) -> ApiResponse<EventDate> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.ledger.set_lock_time(event_date_id, hours_before)).await
        }
        .await;

        respond(result, messages::EVENT_DATE_LOCK_UPDATED, 200)
    }

    pub async fn resize(&self, identity: &dyn IdentityProvider, event_date_id: i64, capacity: i32) -> ApiResponse<EventDate> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.ledger.resize(event_date_id, capacity)).await
        }
        .await;

        respond(result, messages::EVENT_DATE_RESIZED, 200)
    }
}
