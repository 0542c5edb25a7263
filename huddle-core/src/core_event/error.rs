//! Event operation errors

use crate::core_store::StoreError;
use thiserror::Error;

/// Failures of event mutations, queries and moderation
///
/// `NotFound` covers both absent events and events the caller may not see.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl EventError {
    pub(crate) fn event_not_found(event_id: impl std::fmt::Display) -> Self {
        EventError::NotFound(format!("event {}", event_id))
    }
}
