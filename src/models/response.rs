//! Response contract handed back to the surrounding web layer

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::utils::errors::BookingError;

/// One page of results plus the totals needed to render pagination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paginated<T> {
    pub current_page: u32,
    pub items_per_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_items: u64, current_page: u32, items_per_page: u32) -> Self {
        let total_pages = if items_per_page == 0 {
            0
        } else {
            total_items.div_ceil(u64::from(items_per_page))
        };

        Self {
            current_page,
            items_per_page,
            total_pages,
            total_items,
            items,
        }
    }
}

/// Generic response wrapper for every handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub api_id: String,
    pub error: Option<String>,
    pub message: Option<String>,
    pub data: Option<T>,
    pub status_code: u16,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, status_code: u16, data: T) -> Self {
        let response = Self {
            api_id: Uuid::new_v4().to_string(),
            error: None,
            message: Some(message.to_string()),
            data: Some(data),
            status_code,
        };

        info!(api_id = %response.api_id, status_code = status_code, "Generated response");
        response
    }

    pub fn from_error(error: &BookingError) -> Self {
        let api_id = Uuid::new_v4().to_string();
        let status_code = error.status_code();

        if error.is_client_error() {
            warn!(api_id = %api_id, status_code = status_code, error = %error, "Request rejected");
        } else {
            error!(api_id = %api_id, status_code = status_code, severity = %error.severity(), error = %error, "Request failed");
        }

        Self {
            api_id,
            error: Some(error.public_message()),
            message: None,
            data: None,
            status_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status_code < 400
    }
}

impl<T> From<crate::Result<ApiResponse<T>>> for ApiResponse<T> {
    fn from(result: crate::Result<ApiResponse<T>>) -> Self {
        result.unwrap_or_else(|e| ApiResponse::from_error(&e))
    }
}
