//! Caller-facing projection of an event
//!
//! The access section depends on the visibility mode: nothing extra for
//! public events, the invited audience for friend and invite-list events, and
//! the shared chat for chat events.

use super::event::Event;
use super::moderation::ModerationStatus;
use super::resolver::{Audience, VisibilityResolver};
use super::visibility::{Visibility, VisibilityKind};
use crate::core_identity::{Chat, User};
use crate::core_store::traits::IdentityDirectory;
use crate::core_store::types::{ChatId, EventId, Timestamp, UserId};
use crate::core_store::StoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub display_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: ChatId,
    pub title: String,
    pub members: Vec<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "access", rename_all = "snake_case")]
pub enum AccessView {
    Public,
    Invited { users_with_invite: Vec<UserSummary> },
    Chat { shared_chat: ChatSummary },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub visibility: VisibilityKind,
    pub status: ModerationStatus,
    pub created_at: Timestamp,
    pub expiration_at: Option<Timestamp>,
    pub owner: UserSummary,
    #[serde(flatten)]
    pub access: AccessView,
}

impl EventView {
    /// Project `event` for callers, resolving users and chats through `directory`
    pub fn project<D: IdentityDirectory + ?Sized>(
        event: &Event,
        directory: &D,
    ) -> Result<Self, StoreError> {
        let owner = directory.get_user(event.owner_id())?.ok_or_else(|| {
            StoreError::corrupted(format!(
                "event {} references missing owner {}",
                event.id(),
                event.owner_id()
            ))
        })?;

        let access = match event.visibility() {
            Visibility::Public => AccessView::Public,
            Visibility::FriendsOnly | Visibility::SelectedIndividuals { .. } => {
                let members = match VisibilityResolver::new(directory).shared_audience(event)? {
                    Audience::Members(members) => members,
                    Audience::Everyone => Default::default(),
                };
                AccessView::Invited {
                    users_with_invite: summarize(directory, members)?,
                }
            }
            Visibility::SpecificChat { chat_id } => {
                let chat = directory.get_chat(chat_id)?.ok_or_else(|| {
                    StoreError::corrupted(format!(
                        "event {} is bound to missing chat {}",
                        event.id(),
                        chat_id
                    ))
                })?;
                AccessView::Chat {
                    shared_chat: summarize_chat(directory, chat)?,
                }
            }
        };

        Ok(EventView {
            id: event.id().clone(),
            title: event.title().to_string(),
            description: event.description().to_string(),
            visibility: event.visibility().kind(),
            status: event.status(),
            created_at: event.created_at(),
            expiration_at: event.expiration_at(),
            owner: UserSummary::from(&owner),
            access,
        })
    }
}

fn summarize<D: IdentityDirectory + ?Sized>(
    directory: &D,
    user_ids: impl IntoIterator<Item = UserId>,
) -> Result<Vec<UserSummary>, StoreError> {
    let mut summaries = Vec::new();
    for user_id in user_ids {
        if let Some(user) = directory.get_user(&user_id)? {
            summaries.push(UserSummary::from(&user));
        }
    }
    summaries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(summaries)
}

fn summarize_chat<D: IdentityDirectory + ?Sized>(
    directory: &D,
    chat: Chat,
) -> Result<ChatSummary, StoreError> {
    Ok(ChatSummary {
        members: summarize(directory, chat.members)?,
        id: chat.id,
        title: chat.title,
    })
}
