//! User, friendship and chat operations

use super::chat::Chat;
use super::error::IdentityError;
use super::user::{Role, User};
use crate::core_store::traits::IdentityStore;
use crate::core_store::types::{ChatId, UserId};
use tracing::{debug, info};

/// Maximum length of display names and chat titles
const MAX_NAME_LENGTH: usize = 100;

/// Identity manager over any `IdentityStore`
pub struct IdentityManager<S> {
    store: S,
}

impl<S: IdentityStore> IdentityManager<S> {
    /// Create a new manager with storage
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn validate_name(kind: &str, name: &str) -> Result<(), IdentityError> {
        if name.trim().is_empty() {
            return Err(IdentityError::Validation(format!("{} must not be empty", kind)));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(IdentityError::Validation(format!(
                "{} must be at most {} characters",
                kind, MAX_NAME_LENGTH
            )));
        }
        Ok(())
    }

    fn require_user(&self, user_id: &UserId) -> Result<User, IdentityError> {
        self.store
            .get_user(user_id)?
            .ok_or_else(|| IdentityError::NotFound(format!("user {}", user_id)))
    }

    /// Register a new user; display names are unique
    pub fn register_user(&self, display_name: String, role: Role) -> Result<User, IdentityError> {
        Self::validate_name("display name", &display_name)?;

        if self.store.find_user_by_name(&display_name)?.is_some() {
            return Err(IdentityError::Duplicate(format!(
                "a user named '{}' already exists",
                display_name
            )));
        }

        let user = User::new(display_name, role);
        self.store.insert_user(&user)?;

        info!(user_id = %user.id, role = %user.role, "registered user");
        Ok(user)
    }

    /// Get a user by ID
    pub fn get_user(&self, user_id: &UserId) -> Result<User, IdentityError> {
        self.require_user(user_id)
    }

    /// List every user
    pub fn list_users(&self) -> Result<Vec<User>, IdentityError> {
        Ok(self.store.list_users()?)
    }

    /// Add `friend_id` to the friend list of `user_id` (one direction only)
    pub fn add_friend(&self, user_id: &UserId, friend_id: &UserId) -> Result<(), IdentityError> {
        if user_id == friend_id {
            return Err(IdentityError::Validation(
                "users cannot befriend themselves".to_string(),
            ));
        }

        self.require_user(user_id)?;
        self.require_user(friend_id)?;

        if self.store.get_friends(user_id)?.contains(friend_id) {
            return Err(IdentityError::Duplicate(format!(
                "user {} is already a friend",
                friend_id
            )));
        }

        self.store.add_friend(user_id, friend_id)?;

        info!(%user_id, %friend_id, "added friend");
        Ok(())
    }

    /// Friends of a user, sorted by display name
    pub fn friends(&self, user_id: &UserId) -> Result<Vec<User>, IdentityError> {
        self.require_user(user_id)?;

        let mut friends = Vec::new();
        for friend_id in self.store.get_friends(user_id)? {
            if let Some(friend) = self.store.get_user(&friend_id)? {
                friends.push(friend);
            }
        }
        friends.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        Ok(friends)
    }

    /// Create a chat owned by `owner_id`
    pub fn create_chat(&self, owner_id: &UserId, title: String) -> Result<Chat, IdentityError> {
        Self::validate_name("chat title", &title)?;
        self.require_user(owner_id)?;

        let chat = Chat::new(title, owner_id.clone());
        self.store.save_chat(&chat)?;

        info!(chat_id = %chat.id, %owner_id, "created chat");
        Ok(chat)
    }

    /// Add a member to a chat; only the chat owner may do this
    ///
    /// Chats the actor does not own are reported as not found.
    pub fn add_chat_member(
        &self,
        chat_id: &ChatId,
        actor_id: &UserId,
        user_id: &UserId,
    ) -> Result<Chat, IdentityError> {
        let mut chat = self
            .store
            .get_chat(chat_id)?
            .filter(|chat| chat.is_owner(actor_id))
            .ok_or_else(|| IdentityError::NotFound(format!("chat {}", chat_id)))?;

        self.require_user(user_id)?;

        chat.add_member(user_id.clone())?;
        self.store.save_chat(&chat)?;

        info!(%chat_id, %user_id, "added chat member");
        Ok(chat)
    }

    /// Chats owned by a user
    pub fn owned_chats(&self, owner_id: &UserId) -> Result<Vec<Chat>, IdentityError> {
        let chats = self.store.chats_owned_by(owner_id)?;
        debug!(%owner_id, count = chats.len(), "listed owned chats");
        Ok(chats)
    }

    /// Every chat
    pub fn list_chats(&self) -> Result<Vec<Chat>, IdentityError> {
        Ok(self.store.list_chats()?)
    }
}
