//! Waiting list handlers

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{messages, respond, ListParams};
use crate::models::{
    ApiResponse, CreateWaitingListRequest, Paginated, UpdateWaitingListRequest, WaitingListEntry, WaitingListStatus,
};
use crate::services::{IdentityProvider, ServiceFactory, WaitingListManager};
use crate::utils::helpers::retry_on_conflict;

/// Payload of a `process` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub processed_entries: usize,
}

/// Payload of a `reorder` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorderOutcome {
    pub moved_entries: u64,
}

#[derive(Clone)]
pub struct WaitingListHandler {
    waiting_list: WaitingListManager,
    retry_attempts: u32,
}

impl WaitingListHandler {
    pub fn new(services: &ServiceFactory, retry_attempts: u32) -> Self {
        Self {
            waiting_list: services.waiting_list.clone(),
            retry_attempts,
        }
    }

    /// Queue the acting user for a full event date
    pub async fn add(&self, identity: &dyn IdentityProvider, request: CreateWaitingListRequest) -> ApiResponse<WaitingListEntry> {
        let result = async {
            let user_id = identity.require_user_id()?;
            debug!(user_id, event_date_id = request.event_date_id, "Handling add to waiting list");

            let request = CreateWaitingListRequest { user_id, ..request };
            retry_on_conflict(self.retry_attempts, || self.waiting_list.add(request.clone())).await
        }
        .await;

        respond(result, messages::WAITING_LIST_ADDED, 201)
    }

    pub async fn update(
        &self,
        identity: &dyn IdentityProvider,
        entry_id: i64,
        request: UpdateWaitingListRequest,
    ) -> ApiResponse<WaitingListEntry> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.waiting_list.update(entry_id, request.clone())).await
        }
        .await;

        respond(result, messages::WAITING_LIST_ENTRY_UPDATED, 200)
    }

    pub async fn update_status(
        &self,
        identity: &dyn IdentityProvider,
        entry_id: i64,
        status: WaitingListStatus,
    ) -> ApiResponse<WaitingListEntry> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.waiting_list.update_status(entry_id, status)).await
        }
        .await;

        respond(result, messages::WAITING_LIST_ENTRY_UPDATED, 200)
    }

    pub async fn delete(&self, identity: &dyn IdentityProvider, entry_id: i64) -> ApiResponse<()> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.waiting_list.delete(entry_id)).await
        }
        .await;

        respond(result, messages::WAITING_LIST_ENTRY_DELETED, 200)
    }

    pub async fn process(&self, identity: &dyn IdentityProvider, event_date_id: i64) -> ApiResponse<ProcessOutcome> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.waiting_list.process(event_date_id))
                .await
                .map(|processed_entries| ProcessOutcome { processed_entries })
        }
        .await;

        respond(result, messages::WAITING_LIST_PROCESSED, 200)
    }

    pub async fn reorder(&self, identity: &dyn IdentityProvider, event_date_id: i64) -> ApiResponse<ReorderOutcome> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.waiting_list.reorder(event_date_id))
                .await
                .map(|moved_entries| ReorderOutcome { moved_entries })
        }
        .await;

        respond(result, messages::WAITING_LIST_REORDERED, 200)
    }

    pub async fn get(&self, identity: &dyn IdentityProvider, entry_id: i64) -> ApiResponse<WaitingListEntry> {
        let result = async {
            identity.require_user_id()?;
            self.waiting_list.get(entry_id).await
        }
        .await;

        respond(result, messages::WAITING_LIST_ENTRY_RETRIEVED, 200)
    }

    pub async fn get_by_event_date_and_user(
        &self,
        identity: &dyn IdentityProvider,
        event_date_id: i64,
        user_id: i64,
    ) -> ApiResponse<WaitingListEntry> {
        let result = async {
            identity.require_user_id()?;
            self.waiting_list.get_by_event_date_and_user(event_date_id, user_id).await
        }
        .await;

        respond(result, messages::WAITING_LIST_ENTRY_RETRIEVED, 200)
    }

    pub async fn list(&self, identity: &dyn IdentityProvider, params: &ListParams) -> ApiResponse<Paginated<WaitingListEntry>> {
        let result = async {
            identity.require_user_id()?;
            let query = params.to_query::<WaitingListEntry>()?;
            self.waiting_list.list(&query).await
        }
        .await;

        respond(result, messages::WAITING_LIST_RETRIEVED, 200)
    }

    /// Entries of the acting user across all event dates
    pub async fn list_mine(&self, identity: &dyn IdentityProvider, params: &ListParams) -> ApiResponse<Paginated<WaitingListEntry>> {
        let result = async {
            let user_id = identity.require_user_id()?;
            let query = params.to_query::<WaitingListEntry>()?;
            self.waiting_list.list_by_user(user_id, &query).await
        }
        .await;

        respond(result, messages::WAITING_LIST_RETRIEVED, 200)
    }

    pub async fn list_by_event_date(
        &self,
        identity: &dyn IdentityProvider,
        event_date_id: i64,
        params: &ListParams,
    ) -> ApiResponse<Paginated<WaitingListEntry>> {
        let result = async {
            identity.require_user_id()?;
            let query = params.to_query::<WaitingListEntry>()?;
            self.waiting_list.list_by_event_date(event_date_id, &query).await
        }
        .await;

        respond(result, messages::WAITING_LIST_RETRIEVED, 200)
    }
}
