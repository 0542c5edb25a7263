//! Visibility modes and their auxiliary data

use super::error::EventError;
use crate::core_store::types::{ChatId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Who an event is shared with
///
/// Each mode carries exactly the data it needs, so an invite list can never
/// coexist with a bound chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Everyone on the network
    Public,
    /// The owner's friends
    FriendsOnly,
    /// An explicit invite list, seeded with the owner
    SelectedIndividuals { users: BTreeSet<UserId> },
    /// Members of one chat
    SpecificChat { chat_id: ChatId },
}

impl Visibility {
    /// Build a fresh visibility of `kind` for an event owned by `owner_id`
    pub(crate) fn seeded(
        kind: VisibilityKind,
        owner_id: &UserId,
        chat_id: Option<ChatId>,
    ) -> Result<Self, EventError> {
        Ok(match kind {
            VisibilityKind::Public => Visibility::Public,
            VisibilityKind::FriendsOnly => Visibility::FriendsOnly,
            VisibilityKind::SelectedIndividuals => {
                let mut users = BTreeSet::new();
                users.insert(owner_id.clone());
                Visibility::SelectedIndividuals { users }
            }
            VisibilityKind::SpecificChat => {
                let chat_id = chat_id.ok_or_else(|| {
                    EventError::Validation(
                        "a chat must be given when visibility is SPECIFIC_CHAT".to_string(),
                    )
                })?;
                Visibility::SpecificChat { chat_id }
            }
        })
    }

    pub fn kind(&self) -> VisibilityKind {
        match self {
            Visibility::Public => VisibilityKind::Public,
            Visibility::FriendsOnly => VisibilityKind::FriendsOnly,
            Visibility::SelectedIndividuals { .. } => VisibilityKind::SelectedIndividuals,
            Visibility::SpecificChat { .. } => VisibilityKind::SpecificChat,
        }
    }

    /// Explicit invite list, present only for `SelectedIndividuals`
    pub fn allowed_users(&self) -> Option<&BTreeSet<UserId>> {
        match self {
            Visibility::SelectedIndividuals { users } => Some(users),
            _ => None,
        }
    }

    /// Bound chat, present only for `SpecificChat`
    pub fn allowed_chat(&self) -> Option<&ChatId> {
        match self {
            Visibility::SpecificChat { chat_id } => Some(chat_id),
            _ => None,
        }
    }
}

/// Name of a visibility mode without its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisibilityKind {
    Public,
    FriendsOnly,
    SelectedIndividuals,
    SpecificChat,
}

impl VisibilityKind {
    pub const ALL: [VisibilityKind; 4] = [
        VisibilityKind::Public,
        VisibilityKind::FriendsOnly,
        VisibilityKind::SelectedIndividuals,
        VisibilityKind::SpecificChat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VisibilityKind::Public => "PUBLIC",
            VisibilityKind::FriendsOnly => "FRIENDS_ONLY",
            VisibilityKind::SelectedIndividuals => "SELECTED_INDIVIDUALS",
            VisibilityKind::SpecificChat => "SPECIFIC_CHAT",
        }
    }
}

impl fmt::Display for VisibilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisibilityKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        VisibilityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| EventError::Validation(format!("unknown visibility '{}'", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_individuals_seeds_owner() {
        let owner = UserId::new("alice");
        let visibility =
            Visibility::seeded(VisibilityKind::SelectedIndividuals, &owner, None).unwrap();

        assert_eq!(visibility.allowed_users().unwrap().len(), 1);
        assert!(visibility.allowed_users().unwrap().contains(&owner));
        assert!(visibility.allowed_chat().is_none());
    }

    #[test]
    fn test_specific_chat_requires_chat() {
        let owner = UserId::new("alice");
        let result = Visibility::seeded(VisibilityKind::SpecificChat, &owner, None);
        assert!(matches!(result, Err(EventError::Validation(_))));
    }

    #[test]
    fn test_chat_is_ignored_for_other_modes() {
        let owner = UserId::new("alice");
        let visibility =
            Visibility::seeded(VisibilityKind::Public, &owner, Some(ChatId::new("c1"))).unwrap();
        assert_eq!(visibility, Visibility::Public);
    }

    #[test]
    fn test_kind_parsing_is_lenient() {
        assert_eq!(
            "friends-only".parse::<VisibilityKind>().unwrap(),
            VisibilityKind::FriendsOnly
        );
        assert_eq!(
            "SPECIFIC_CHAT".parse::<VisibilityKind>().unwrap(),
            VisibilityKind::SpecificChat
        );
        assert!("secret".parse::<VisibilityKind>().is_err());
    }

    #[test]
    fn test_serialized_form_is_tagged_by_mode() {
        let visibility = Visibility::SpecificChat { chat_id: ChatId::new("c1") };
        let json = serde_json::to_value(&visibility).unwrap();
        assert_eq!(json["mode"], "SPECIFIC_CHAT");
        assert_eq!(json["chat_id"], "c1");
    }
}
