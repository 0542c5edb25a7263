//! Manager trait for event operations

use super::error::EventError;
use super::event::Event;
use super::moderation::ModerationStatus;
use super::view::EventView;
use super::visibility::VisibilityKind;
use crate::core_store::types::{ChatId, EventId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Fields of a new event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub visibility: VisibilityKind,
    #[serde(default)]
    pub expiration_at: Option<Timestamp>,
    /// Required for `SpecificChat`
    #[serde(default)]
    pub allowed_chat: Option<ChatId>,
}

/// Full replacement of an event's editable fields
///
/// `expiration_at: None` clears the expiration. Keeping the same
/// `SpecificChat` mode without a chat keeps the bound chat. A chat for any
/// other mode fails with `InvalidState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    pub title: String,
    pub description: String,
    pub visibility: VisibilityKind,
    pub expiration_at: Option<Timestamp>,
    pub allowed_chat: Option<ChatId>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<VisibilityKind>,
    pub expiration_at: Option<Timestamp>,
    /// Rebinds a `SpecificChat` event; `InvalidState` for other modes
    pub allowed_chat: Option<ChatId>,
}

/// Access-controlled event operations
///
/// Every caller is identified by user ID; unknown callers get `NotFound`.
pub trait EventManager {
    /// Create an event owned by `owner_id`
    fn create_event(&self, owner_id: &UserId, request: NewEvent) -> Result<EventView, EventError>;

    /// Events owned by the viewer, any status
    fn get_own_events(&self, viewer_id: &UserId) -> Result<Vec<Event>, EventError>;

    /// Fetch one event if the viewer may see it
    fn get_event_for_viewer(
        &self,
        event_id: &EventId,
        viewer_id: &UserId,
    ) -> Result<Event, EventError>;

    /// Open events shared with the viewer, excluding their own
    fn get_discoverable_events(&self, viewer_id: &UserId) -> Result<Vec<Event>, EventError>;

    /// Replace title, description, expiration and visibility
    fn update_event(
        &self,
        event_id: &EventId,
        actor_id: &UserId,
        update: EventUpdate,
    ) -> Result<EventView, EventError>;

    /// Apply the fields present in `patch`
    fn patch_event(
        &self,
        event_id: &EventId,
        actor_id: &UserId,
        patch: EventPatch,
    ) -> Result<EventView, EventError>;

    /// Soft-delete an event
    fn remove_event(&self, event_id: &EventId, actor_id: &UserId) -> Result<EventView, EventError>;

    /// Add a user to the invite list of a `SelectedIndividuals` event
    fn invite_user(
        &self,
        event_id: &EventId,
        actor_id: &UserId,
        invitee_id: &UserId,
    ) -> Result<EventView, EventError>;

    /// Approve or reject an event (moderators only)
    fn change_status(
        &self,
        event_id: &EventId,
        moderator_id: &UserId,
        status: ModerationStatus,
    ) -> Result<EventView, EventError>;

    /// Every event, optionally filtered by status (moderators only)
    fn list_all_events(
        &self,
        moderator_id: &UserId,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Event>, EventError>;

    /// Any event regardless of visibility (moderators only)
    fn get_any_event(&self, moderator_id: &UserId, event_id: &EventId)
        -> Result<Event, EventError>;

    /// Build the caller-facing projection of an event
    fn project(&self, event: &Event) -> Result<EventView, EventError>;
}
