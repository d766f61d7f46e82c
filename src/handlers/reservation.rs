//! Reservation handlers

use tracing::debug;

use super::{messages, respond, ListParams};
use crate::models::{ApiResponse, CreateReservationRequest, Paginated, Reservation, UpdateReservationRequest};
use crate::services::{IdentityProvider, ReservationManager, ServiceFactory};
use crate::utils::helpers::retry_on_conflict;

#[derive(Clone)]
pub struct ReservationHandler {
    reservations: ReservationManager,
    retry_attempts: u32,
}

impl ReservationHandler {
    pub fn new(services: &ServiceFactory, retry_attempts: u32) -> Self {
        Self {
            reservations: services.reservations.clone(),
            retry_attempts,
        }
    }

    /// Reserve seats for the acting user
    pub async fn create(&self, identity: &dyn IdentityProvider, request: CreateReservationRequest) -> ApiResponse<Reservation> {
        let result = async {
            let user_id = identity.require_user_id()?;
            debug!(user_id, event_date_id = request.event_date_id, "Handling create reservation");

            let request = CreateReservationRequest { user_id, ..request };
            retry_on_conflict(self.retry_attempts, || self.reservations.create(request.clone())).await
        }
        .await;

        respond(result, messages::RESERVATION_CREATED, 201)
    }

    pub async fn update(
        &self,
        identity: &dyn IdentityProvider,
        reservation_id: i64,
        request: UpdateReservationRequest,
    ) -> ApiResponse<Reservation> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.reservations.update(reservation_id, request.clone())).await
        }
        .await;

        respond(result, messages::RESERVATION_UPDATED, 200)
    }

    pub async fn cancel(&self, identity: &dyn IdentityProvider, reservation_id: i64) -> ApiResponse<Reservation> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.reservations.cancel(reservation_id)).await
        }
        .await;

        respond(result, messages::RESERVATION_CANCELLED, 200)
    }

    pub async fn confirm(&self, identity: &dyn IdentityProvider, reservation_id: i64) -> ApiResponse<Reservation> {
        let result = async {
            identity.require_user_id()?;
            retry_on_conflict(self.retry_attempts, || self.reservations.confirm(reservation_id)).await
        }
        .await;

        respond(result, messages::RESERVATION_CONFIRMED, 200)
    }

    pub async fn get(&self, identity: &dyn IdentityProvider, reservation_id: i64) -> ApiResponse<Reservation> {
        let result = async {
            identity.require_user_id()?;
            self.reservations.get(reservation_id).await
        }
        .await;

        respond(result, messages::RESERVATION_RETRIEVED, 200)
    }

    pub async fn find_by_code(&self, identity: &dyn IdentityProvider, code: &str) -> ApiResponse<Reservation> {
        let result = async {
            identity.require_user_id()?;
            self.reservations.get_by_code(code).await
        }
        .await;

        respond(result, messages::RESERVATION_FOUND, 200)
    }

    pub async fn list(&self, identity: &dyn IdentityProvider, params: &ListParams) -> ApiResponse<Paginated<Reservation>> {
        let result = async {
            identity.require_user_id()?;
            let query = params.to_query::<Reservation>()?;
            self.reservations.list(&query).await
        }
        .await;

        respond(result, messages::ALL_RESERVATIONS_RETRIEVED, 200)
    }

    /// Reservations of the acting user
    pub async fn list_mine(&self, identity: &dyn IdentityProvider, params: &ListParams) -> ApiResponse<Paginated<Reservation>> {
        let result = async {
            let user_id = identity.require_user_id()?;
            let query = params.to_query::<Reservation>()?;
            self.reservations.list_by_user(user_id, &query).await
        }
        .await;

        respond(result, messages::USER_RESERVATIONS_RETRIEVED, 200)
    }

    pub async fn list_by_event(
        &self,
        identity: &dyn IdentityProvider,
        event_id: i64,
        params: &ListParams,
    ) -> ApiResponse<Paginated<Reservation>> {
        let result = async {
            identity.require_user_id()?;
            let query = params.to_query::<Reservation>()?;
            self.reservations.list_by_event(event_id, &query).await
        }
        .await;

        respond(result, messages::EVENT_RESERVATIONS_RETRIEVED, 200)
    }

    /// Reservations of the acting user for one event
    pub async fn list_mine_for_event(
        &self,
        identity: &dyn IdentityProvider,
        event_id: i64,
        params: &ListParams,
    ) -> ApiResponse<Paginated<Reservation>> {
        let result = async {
            let user_id = identity.require_user_id()?;
            let query = params.to_query::<Reservation>()?;
            self.reservations.list_by_user_and_event(user_id, event_id, &query).await
        }
        .await;

        respond(result, messages::USER_EVENT_RESERVATIONS_RETRIEVED, 200)
    }

    pub async fn list_by_event_date(
        &self,
        identity: &dyn IdentityProvider,
        event_date_id: i64,
        params: &ListParams,
    ) -> ApiResponse<Paginated<Reservation>> {
        let result = async {
            identity.require_user_id()?;
            let query = params.to_query::<Reservation>()?;
            self.reservations.list_by_event_date(event_date_id, &query).await
        }
        .await;

        respond(result, messages::EVENT_RESERVATIONS_RETRIEVED, 200)
    }
}
