//! Events and the rules deciding who may see them
//!
//! - [`Event`] guards mode/data coherence on every mutation.
//! - [`ModerationStatus`] gates whether anyone but the owner sees an event.
//! - [`VisibilityResolver`] answers both "can this user see this event" and
//!   "which events can this user discover" from one predicate.
//! - [`EventManagerImpl`] orchestrates them over a store.

mod error;
mod event;
mod manager;
mod manager_impl;
mod moderation;
mod resolver;
mod view;
mod visibility;

pub use error::EventError;
pub use event::Event;
pub use manager::{EventManager, EventPatch, EventUpdate, NewEvent};
pub use manager_impl::EventManagerImpl;
pub use moderation::{ModerationActor, ModerationStatus};
pub use resolver::{can_bypass_visibility, Audience, VisibilityResolver};
pub use view::{AccessView, ChatSummary, EventView, UserSummary};
pub use visibility::{Visibility, VisibilityKind};
