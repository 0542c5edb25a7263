//! Event entity and its mutation rules

use super::error::EventError;
use super::moderation::{ModerationActor, ModerationStatus};
use super::visibility::{Visibility, VisibilityKind};
use crate::core_store::types::{ChatId, EventId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A scheduled happening shared with some audience
///
/// Fields are private so every change goes through the checks below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    title: String,
    description: String,
    owner_id: UserId,
    created_at: Timestamp,
    expiration_at: Option<Timestamp>,
    status: ModerationStatus,
    visibility: Visibility,
}

fn validate_title(title: &str) -> Result<(), EventError> {
    if title.trim().is_empty() {
        return Err(EventError::Validation("title must not be blank".to_string()));
    }
    Ok(())
}

fn validate_expiration(expiration_at: Option<Timestamp>, now: Timestamp) -> Result<(), EventError> {
    match expiration_at {
        Some(at) if at <= now => Err(EventError::Validation(format!(
            "expiration {} must be in the future",
            at
        ))),
        Some(at) if at > Timestamp::LATEST => Err(EventError::Validation(format!(
            "expiration {} is too far in the future",
            at
        ))),
        _ => Ok(()),
    }
}

impl Event {
    /// Create a new event awaiting moderation
    ///
    /// `allowed_chat` is required for `SpecificChat` and ignored otherwise.
    pub fn create(
        owner_id: UserId,
        title: String,
        description: String,
        kind: VisibilityKind,
        expiration_at: Option<Timestamp>,
        allowed_chat: Option<ChatId>,
        now: Timestamp,
    ) -> Result<Self, EventError> {
        validate_title(&title)?;
        validate_expiration(expiration_at, now)?;
        let visibility = Visibility::seeded(kind, &owner_id, allowed_chat)?;

        Ok(Event {
            id: EventId::generate(),
            title,
            description,
            owner_id,
            created_at: now,
            expiration_at,
            status: ModerationStatus::Unverified,
            visibility,
        })
    }

    /// Rebuild an event from persisted fields
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: EventId,
        title: String,
        description: String,
        owner_id: UserId,
        created_at: Timestamp,
        expiration_at: Option<Timestamp>,
        status: ModerationStatus,
        visibility: Visibility,
    ) -> Self {
        Event {
            id,
            title,
            description,
            owner_id,
            created_at,
            expiration_at,
            status,
            visibility,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn expiration_at(&self) -> Option<Timestamp> {
        self.expiration_at
    }

    pub fn status(&self) -> ModerationStatus {
        self.status
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }

    /// Invite a user to a `SelectedIndividuals` event
    pub fn add_allowed_user(&mut self, user_id: UserId) -> Result<(), EventError> {
        match &mut self.visibility {
            Visibility::SelectedIndividuals { users } => {
                if !users.insert(user_id.clone()) {
                    return Err(EventError::Duplicate(format!(
                        "user {} is already invited",
                        user_id
                    )));
                }
                Ok(())
            }
            other => Err(EventError::InvalidState(format!(
                "cannot invite users to a {} event",
                other.kind()
            ))),
        }
    }

    /// Point a `SpecificChat` event at another chat
    pub fn bind_chat(&mut self, chat_id: ChatId) -> Result<(), EventError> {
        match &mut self.visibility {
            Visibility::SpecificChat { chat_id: bound } => {
                *bound = chat_id;
                Ok(())
            }
            other => Err(EventError::InvalidState(format!(
                "cannot bind a chat to a {} event",
                other.kind()
            ))),
        }
    }

    /// Switch to another visibility mode, dropping the old mode's data
    pub fn change_visibility(
        &mut self,
        kind: VisibilityKind,
        chat_id: Option<ChatId>,
    ) -> Result<(), EventError> {
        if kind == self.visibility.kind() {
            return Err(EventError::Validation(format!("visibility is already {}", kind)));
        }

        self.visibility = Visibility::seeded(kind, &self.owner_id, chat_id)?;
        Ok(())
    }

    /// Move through the moderation lifecycle
    pub fn set_status(
        &mut self,
        status: ModerationStatus,
        actor: ModerationActor,
    ) -> Result<(), EventError> {
        self.status = self.status.transition(status, actor)?;
        Ok(())
    }

    pub fn rename(&mut self, title: String) -> Result<(), EventError> {
        validate_title(&title)?;
        self.title = title;
        Ok(())
    }

    pub fn describe(&mut self, description: String) {
        self.description = description;
    }

    /// Replace the expiration; `None` means the event never expires
    pub fn set_expiration(
        &mut self,
        expiration_at: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<(), EventError> {
        validate_expiration(expiration_at, now)?;
        self.expiration_at = expiration_at;
        Ok(())
    }
}
