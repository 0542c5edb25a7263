//! Event manager backed by an identity directory and an event store

use super::error::EventError;
use super::event::Event;
use super::manager::{EventManager, EventPatch, EventUpdate, NewEvent};
use super::moderation::{ModerationActor, ModerationStatus};
use super::resolver::{can_bypass_visibility, VisibilityResolver};
use super::view::EventView;
use super::visibility::VisibilityKind;
use crate::config::EventsConfig;
use crate::core_identity::User;
use crate::core_store::traits::{EventStore, IdentityDirectory};
use crate::core_store::types::{ChatId, EventId, Timestamp, UserId};
use crate::metrics::{self, record_counter, Timer};
use tracing::{debug, info, warn};

/// Manager implementation with the access-control rules
///
/// Stateless apart from the store: every call loads what it needs, decides,
/// and persists at most one event.
pub struct EventManagerImpl<S> {
    store: S,
    config: EventsConfig,
}

impl<S> EventManagerImpl<S>
where
    S: IdentityDirectory + EventStore,
{
    /// Create a new manager with storage
    pub fn new(store: S, config: EventsConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn resolver(&self) -> VisibilityResolver<'_, S> {
        VisibilityResolver::new(&self.store)
    }

    fn validate_title_length(&self, title: &str) -> Result<(), EventError> {
        let length = title.chars().count();
        if length > self.config.max_title_length {
            return Err(EventError::Validation(format!(
                "title is {} characters, at most {} allowed",
                length, self.config.max_title_length
            )));
        }
        Ok(())
    }

    fn require_user(&self, user_id: &UserId) -> Result<User, EventError> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| EventError::NotFound(format!("user {}", user_id)))
    }

    fn require_event(&self, event_id: &EventId) -> Result<Event, EventError> {
        self.store
            .find_event(event_id)?
            .ok_or_else(|| EventError::event_not_found(event_id))
    }

    fn require_moderator(&self, user_id: &UserId) -> Result<User, EventError> {
        let user = self.require_user(user_id)?;
        if !can_bypass_visibility(&user) {
            record_counter(metrics::ACCESS_DENIED, 1);
            warn!(%user_id, "moderator action refused");
            return Err(EventError::Authorization(
                "only moderators can do this".to_string(),
            ));
        }
        Ok(user)
    }

    /// Load an event for mutation by its owner
    ///
    /// Callers who can see the event get `Authorization`, everyone else
    /// `NotFound`.
    fn load_owned(&self, event_id: &EventId, actor_id: &UserId) -> Result<Event, EventError> {
        let actor = self.require_user(actor_id)?;
        let event = self.require_event(event_id)?;

        if event.is_owned_by(actor_id) {
            return Ok(event);
        }

        record_counter(metrics::ACCESS_DENIED, 1);
        warn!(%event_id, %actor_id, "mutation by non-owner refused");

        if self.resolver().is_visible_to(&event, &actor)? {
            Err(EventError::Authorization(format!(
                "only the owner can modify event {}",
                event_id
            )))
        } else {
            Err(EventError::event_not_found(event_id))
        }
    }

    fn ensure_not_removed(event: &Event) -> Result<(), EventError> {
        if event.status() == ModerationStatus::Removed {
            return Err(EventError::InvalidState(format!(
                "event {} has been removed",
                event.id()
            )));
        }
        Ok(())
    }

    /// The owner must belong to any chat an event is bound to
    fn ensure_chat_bindable(&self, chat_id: &ChatId, owner_id: &UserId) -> Result<(), EventError> {
        if self.store.get_chat(chat_id)?.is_none() {
            return Err(EventError::Validation(format!("chat {} does not exist", chat_id)));
        }
        if !self.store.is_chat_member(chat_id, owner_id)? {
            return Err(EventError::Validation(format!(
                "event owner is not a member of chat {}",
                chat_id
            )));
        }
        Ok(())
    }

    /// Switch mode when it differs, then bind any chat that was not consumed
    ///
    /// A chat given for a mode other than `SpecificChat` is an `InvalidState`.
    fn apply_visibility(
        &self,
        event: &mut Event,
        kind: VisibilityKind,
        mut chat_id: Option<ChatId>,
    ) -> Result<(), EventError> {
        if kind == VisibilityKind::SpecificChat {
            if let Some(chat_id) = &chat_id {
                self.ensure_chat_bindable(chat_id, event.owner_id())?;
            }
        }

        if kind != event.visibility().kind() {
            let from = event.visibility().kind();
            let seed = match kind {
                VisibilityKind::SpecificChat => chat_id.take(),
                _ => None,
            };
            event.change_visibility(kind, seed)?;
            record_counter(metrics::EVENTS_VISIBILITY_CHANGED, 1);
            info!(event_id = %event.id(), %from, to = %kind, "changed visibility");
        }

        if let Some(chat_id) = chat_id {
            event.bind_chat(chat_id)?;
        }

        Ok(())
    }

    fn persist(&self, event: &Event) -> Result<EventView, EventError> {
        self.store.save_event(event)?;
        self.project(event)
    }
}

impl<S> EventManager for EventManagerImpl<S>
where
    S: IdentityDirectory + EventStore,
{
    fn create_event(&self, owner_id: &UserId, request: NewEvent) -> Result<EventView, EventError> {
        self.require_user(owner_id)?;
        self.validate_title_length(&request.title)?;

        let allowed_chat = match request.visibility {
            VisibilityKind::SpecificChat => request.allowed_chat,
            _ => None,
        };
        if let Some(chat_id) = &allowed_chat {
            self.ensure_chat_bindable(chat_id, owner_id)?;
        }

        let event = Event::create(
            owner_id.clone(),
            request.title,
            request.description,
            request.visibility,
            request.expiration_at,
            allowed_chat,
            Timestamp::now(),
        )?;

        let view = self.persist(&event)?;

        record_counter(metrics::EVENTS_CREATED, 1);
        info!(
            event_id = %event.id(),
            %owner_id,
            visibility = %request.visibility,
            "created event"
        );
        Ok(view)
    }

    fn get_own_events(&self, viewer_id: &UserId) -> Result<Vec<Event>, EventError> {
        self.require_user(viewer_id)?;
        let events = self.store.find_events_by_owner(viewer_id)?;
        debug!(%viewer_id, count = events.len(), "listed own events");
        Ok(events)
    }

    fn get_event_for_viewer(
        &self,
        event_id: &EventId,
        viewer_id: &UserId,
    ) -> Result<Event, EventError> {
        let viewer = self.require_user(viewer_id)?;
        let event = self.require_event(event_id)?;

        if !self.resolver().is_visible_to(&event, &viewer)? {
            record_counter(metrics::ACCESS_DENIED, 1);
            warn!(%event_id, %viewer_id, "event hidden from viewer");
            return Err(EventError::event_not_found(event_id));
        }

        debug!(%event_id, %viewer_id, "fetched event");
        Ok(event)
    }

    fn get_discoverable_events(&self, viewer_id: &UserId) -> Result<Vec<Event>, EventError> {
        let viewer = self.require_user(viewer_id)?;

        let timer = Timer::new(metrics::DISCOVERY_DURATION);
        let candidates = self.store.find_events_by_status(ModerationStatus::Opened)?;
        let candidate_count = candidates.len();
        let events = self.resolver().accessible_events(candidates, &viewer)?;
        let elapsed = timer.stop();

        debug!(
            %viewer_id,
            candidates = candidate_count,
            accessible = events.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "discovered events"
        );
        Ok(events)
    }

    fn update_event(
        &self,
        event_id: &EventId,
        actor_id: &UserId,
        update: EventUpdate,
    ) -> Result<EventView, EventError> {
        let mut event = self.load_owned(event_id, actor_id)?;
        Self::ensure_not_removed(&event)?;
        self.validate_title_length(&update.title)?;

        let now = Timestamp::now();
        event.rename(update.title)?;
        event.describe(update.description);
        event.set_expiration(update.expiration_at, now)?;
        self.apply_visibility(&mut event, update.visibility, update.allowed_chat)?;

        let view = self.persist(&event)?;
        info!(%event_id, %actor_id, "updated event");
        Ok(view)
    }

    fn patch_event(
        &self,
        event_id: &EventId,
        actor_id: &UserId,
        patch: EventPatch,
    ) -> Result<EventView, EventError> {
        let mut event = self.load_owned(event_id, actor_id)?;
        Self::ensure_not_removed(&event)?;

        if let Some(title) = patch.title {
            self.validate_title_length(&title)?;
            event.rename(title)?;
        }
        if let Some(description) = patch.description {
            event.describe(description);
        }
        if let Some(expiration_at) = patch.expiration_at {
            event.set_expiration(Some(expiration_at), Timestamp::now())?;
        }

        // A chat alone rebinds an event that is already chat-scoped
        let kind = patch.visibility.unwrap_or_else(|| event.visibility().kind());
        if patch.visibility.is_some() || patch.allowed_chat.is_some() {
            self.apply_visibility(&mut event, kind, patch.allowed_chat)?;
        }

        let view = self.persist(&event)?;
        info!(%event_id, %actor_id, "patched event");
        Ok(view)
    }

    fn remove_event(&self, event_id: &EventId, actor_id: &UserId) -> Result<EventView, EventError> {
        let mut event = self.load_owned(event_id, actor_id)?;
        event.set_status(ModerationStatus::Removed, ModerationActor::Owner)?;

        let view = self.persist(&event)?;

        record_counter(metrics::EVENTS_STATUS_CHANGED, 1);
        info!(%event_id, %actor_id, "removed event");
        Ok(view)
    }

    fn invite_user(
        &self,
        event_id: &EventId,
        actor_id: &UserId,
        invitee_id: &UserId,
    ) -> Result<EventView, EventError> {
        let mut event = self.load_owned(event_id, actor_id)?;
        Self::ensure_not_removed(&event)?;
        self.require_user(invitee_id)?;

        event.add_allowed_user(invitee_id.clone())?;
        let view = self.persist(&event)?;

        record_counter(metrics::EVENTS_INVITES, 1);
        info!(%event_id, %invitee_id, "invited user");
        Ok(view)
    }

    fn change_status(
        &self,
        event_id: &EventId,
        moderator_id: &UserId,
        status: ModerationStatus,
    ) -> Result<EventView, EventError> {
        self.require_moderator(moderator_id)?;
        let mut event = self.require_event(event_id)?;

        let from = event.status();
        event.set_status(status, ModerationActor::Moderator)?;
        let view = self.persist(&event)?;

        record_counter(metrics::EVENTS_STATUS_CHANGED, 1);
        info!(%event_id, %moderator_id, %from, to = %status, "moderated event");
        Ok(view)
    }

    fn list_all_events(
        &self,
        moderator_id: &UserId,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Event>, EventError> {
        self.require_moderator(moderator_id)?;

        let events = match status {
            Some(status) => self.store.find_events_by_status(status)?,
            None => self.store.find_all_events()?,
        };
        debug!(%moderator_id, count = events.len(), "listed events for moderation");
        Ok(events)
    }

    fn get_any_event(
        &self,
        moderator_id: &UserId,
        event_id: &EventId,
    ) -> Result<Event, EventError> {
        self.require_moderator(moderator_id)?;
        self.require_event(event_id)
    }

    fn project(&self, event: &Event) -> Result<EventView, EventError> {
        Ok(EventView::project(event, &self.store)?)
    }
}
