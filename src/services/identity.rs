//! Acting-user lookup
//!
//! The surrounding web layer knows who is calling; the handlers only ask.

use crate::utils::errors::{BookingError, Result};

pub trait IdentityProvider: Send + Sync {
    /// Id of the user performing the current request, if any
    fn current_user_id(&self) -> Option<i64>;

    fn require_user_id(&self) -> Result<i64> {
        self.current_user_id().ok_or(BookingError::Unauthenticated)
    }
}

/// Identity fixed at construction, e.g. resolved from a session by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StaticIdentity(pub Option<i64>);

impl StaticIdentity {
    pub fn user(user_id: i64) -> Self {
        Self(Some(user_id))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<i64> {
        self.0
    }
}
