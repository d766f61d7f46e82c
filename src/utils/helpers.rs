//! Helper functions and utilities
//!
//! Small helpers shared by the services: reservation code generation, text
//! normalization, pagination arithmetic and the bounded retry used for lock
//! conflicts.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use regex::Regex;
use tracing::warn;

use crate::utils::errors::{BookingError, Result};

/// Length of a `local_reservation_code`
pub const RESERVATION_CODE_LENGTH: usize = 8;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random uppercase alphanumeric reservation code
pub fn generate_reservation_code() -> String {
    let mut rng = rand::thread_rng();

    (0..RESERVATION_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CODE_CHARSET.len());
            CODE_CHARSET[idx] as char
        })
        .collect()
}

/// Check that a code has the shape produced by [`generate_reservation_code`]
pub fn is_valid_reservation_code(code: &str) -> bool {
    Regex::new(r"^[A-Z0-9]{8}$")
        .map(|pattern| pattern.is_match(code))
        .unwrap_or(false)
}

/// Calculate pagination offset
pub fn calculate_offset(page: usize, page_size: usize) -> usize {
    page.saturating_sub(1) * page_size
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized contact info, rejecting blank input
pub fn required_contact_info(raw: &str) -> Result<String> {
    let contact_info = normalize_whitespace(raw);
    if contact_info.is_empty() {
        return Err(BookingError::InvalidInput("Contact info is required".to_string()));
    }
    Ok(contact_info)
}

/// Trimmed free text; blank becomes `None`
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|text| !text.is_empty()).map(str::to_string)
}

/// Run `operation` again while it fails with a retryable error
///
/// `attempts` counts the first try; a short linear backoff separates retries.
pub async fn retry_on_conflict<T, F, Fut>(attempts: u32, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Err(e) if e.is_retryable() && attempt < attempts => {
                warn!(attempt = attempt, max_attempts = attempts, error = %e, "Retrying after concurrency conflict");
                tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}
