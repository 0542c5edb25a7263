//! Chat data structures and operations

use super::error::IdentityError;
use crate::core_store::types::{ChatId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A group chat; its member set doubles as an event audience
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    /// Unique identifier
    pub id: ChatId,

    /// Human-readable title
    pub title: String,

    /// Creator of the chat, the only user allowed to add members
    pub owner_id: UserId,

    /// Members, always including the owner
    pub members: BTreeSet<UserId>,

    /// When the chat was created
    pub created_at: Timestamp,
}

impl Chat {
    /// Create a new Chat with the owner as its first member
    pub fn new(title: String, owner_id: UserId) -> Self {
        let mut members = BTreeSet::new();
        members.insert(owner_id.clone());

        Chat {
            id: ChatId::generate(),
            title,
            owner_id,
            members,
            created_at: Timestamp::now(),
        }
    }

    /// Add a member to the chat
    pub fn add_member(&mut self, user_id: UserId) -> Result<(), IdentityError> {
        if self.members.contains(&user_id) {
            return Err(IdentityError::Duplicate(format!(
                "user {} is already a member of chat {}",
                user_id, self.id
            )));
        }

        self.members.insert(user_id);
        Ok(())
    }

    /// Check if a user is a member of the chat
    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    pub fn is_owner(&self, user_id: &UserId) -> bool {
        &self.owner_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_is_first_member() {
        let owner = UserId::new("alice");
        let chat = Chat::new("book club".to_string(), owner.clone());

        assert!(chat.is_member(&owner));
        assert!(chat.is_owner(&owner));
        assert_eq!(chat.members.len(), 1);
    }

    #[test]
    fn test_cannot_add_duplicate_member() {
        let owner = UserId::new("alice");
        let mut chat = Chat::new("book club".to_string(), owner);

        let bob = UserId::new("bob");
        chat.add_member(bob.clone()).unwrap();

        let result = chat.add_member(bob);
        assert!(matches!(result, Err(IdentityError::Duplicate(_))));
    }
}
