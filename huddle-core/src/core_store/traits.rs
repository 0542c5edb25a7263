//! Collaborator interfaces the engine reads and writes through
//!
//! The visibility resolver and the access-control service only ever see these
//! traits. `SqlStore` is the shipped implementation.

use super::errors::StoreError;
use super::types::{ChatId, EventId, UserId};
use crate::core_event::{Event, ModerationStatus};
use crate::core_identity::{Chat, User};
use std::collections::HashSet;

/// Read-only view of users, friendships and chat membership
pub trait IdentityDirectory {
    /// Look up a user by ID
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;

    /// Users that `user_id` has added as friends (outgoing edges)
    fn get_friends(&self, user_id: &UserId) -> Result<HashSet<UserId>, StoreError>;

    /// Look up a chat with its member set
    fn get_chat(&self, chat_id: &ChatId) -> Result<Option<Chat>, StoreError>;

    /// Check chat membership without loading the whole chat
    fn is_chat_member(&self, chat_id: &ChatId, user_id: &UserId) -> Result<bool, StoreError>;
}

/// Writable identity storage used by the identity manager
pub trait IdentityStore: IdentityDirectory {
    /// Insert a newly registered user
    fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Look up a user by display name
    fn find_user_by_name(&self, display_name: &str) -> Result<Option<User>, StoreError>;

    /// List every registered user
    fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Record a directed friendship edge
    fn add_friend(&self, user_id: &UserId, friend_id: &UserId) -> Result<(), StoreError>;

    /// Insert or replace a chat and its member set
    fn save_chat(&self, chat: &Chat) -> Result<(), StoreError>;

    /// List every chat
    fn list_chats(&self) -> Result<Vec<Chat>, StoreError>;

    /// List chats owned by a user
    fn chats_owned_by(&self, owner_id: &UserId) -> Result<Vec<Chat>, StoreError>;
}

/// Event persistence
pub trait EventStore {
    /// Insert or replace an event together with its invite list
    fn save_event(&self, event: &Event) -> Result<(), StoreError>;

    /// Look up an event by ID
    fn find_event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError>;

    /// Every event regardless of status
    fn find_all_events(&self) -> Result<Vec<Event>, StoreError>;

    /// Events currently in `status`
    fn find_events_by_status(&self, status: ModerationStatus) -> Result<Vec<Event>, StoreError>;

    /// Events created by `owner_id`, any status
    fn find_events_by_owner(&self, owner_id: &UserId) -> Result<Vec<Event>, StoreError>;
}
