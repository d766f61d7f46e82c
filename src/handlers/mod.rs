//! Request handlers module
//!
//! Thin adapters between the surrounding web layer and the booking core.
//! Each handler resolves the acting user, retries mutations that hit a lock
//! conflict, and turns the outcome into an [`ApiResponse`].

pub mod event_date;
pub mod messages;
pub mod reservation;
pub mod waiting_list;

pub use event_date::EventDateHandler;
pub use reservation::ReservationHandler;
pub use waiting_list::WaitingListHandler;

use serde::{Deserialize, Serialize};

use crate::models::ApiResponse;
use crate::query::{parse_filter_params, parse_sorting_params, ListQuery, Queryable, DEFAULT_PAGE_SIZE};
use crate::utils::errors::Result;

/// Pagination, filtering and sorting as the list endpoints receive them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub current_page: u32,
    pub items_per_page: u32,
    /// JSON object of `column: value | [values]` plus an optional `search` list
    pub filter_params: Option<String>,
    /// JSON array of single-key `{column: "asc" | "desc"}` objects
    pub sorting_params: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            current_page: 1,
            items_per_page: DEFAULT_PAGE_SIZE,
            filter_params: None,
            sorting_params: None,
        }
    }
}

impl ListParams {
    pub fn page(current_page: u32, items_per_page: u32) -> Self {
        Self { current_page, items_per_page, ..Self::default() }
    }

    /// Parse the raw JSON parameters into a validated query for `T`
    pub fn to_query<T: Queryable>(&self) -> Result<ListQuery> {
        let mut query = ListQuery::new(self.current_page, self.items_per_page);
        if let Some(raw) = self.filter_params.as_deref() {
            query.filters = parse_filter_params::<T>(raw)?;
        }
        if let Some(raw) = self.sorting_params.as_deref() {
            query.sort = parse_sorting_params::<T>(raw)?;
        }

        query.validate::<T>()?;
        Ok(query)
    }
}

/// Wrap a service outcome into the response contract
pub(crate) fn respond<T>(result: Result<T>, message: &str, status_code: u16) -> ApiResponse<T> {
    result
        .map(|data| ApiResponse::success(message, status_code, data))
        .into()
}
