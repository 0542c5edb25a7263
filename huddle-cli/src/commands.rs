//! Subcommands and their dispatch onto the core managers

use anyhow::Result;
use clap::{Args, Subcommand};
use huddle_core::config::Config;
use huddle_core::core_event::{
    Event, EventManager, EventManagerImpl, EventPatch, EventUpdate, EventView, ModerationStatus,
    NewEvent, VisibilityKind,
};
use huddle_core::core_identity::{IdentityManager, Role};
use huddle_core::core_store::{ChatId, EventId, SqlStore, Timestamp, UserId};
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register and look up users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage a user's friend list
    #[command(subcommand)]
    Friend(FriendCommand),

    /// Create chats and add members
    #[command(subcommand)]
    Chat(ChatCommand),

    /// Create, edit and browse events
    #[command(subcommand)]
    Event(EventCommand),

    /// Moderator-only event review
    #[command(subcommand)]
    Moderate(ModerateCommand),
}

/// The acting user; token validation happens outside this tool
#[derive(Args, Debug)]
pub struct Actor {
    #[arg(long = "as", value_name = "USER_ID")]
    id: String,
}

impl Actor {
    fn user_id(&self) -> UserId {
        UserId::new(self.id.as_str())
    }
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a new user
    Register {
        name: String,
        /// Grant the moderator role
        #[arg(long)]
        moderator: bool,
    },
    /// Show one user
    Show { user_id: String },
    /// List every user
    List,
}

#[derive(Subcommand, Debug)]
pub enum FriendCommand {
    /// Add a user to the actor's friend list
    Add {
        #[command(flatten)]
        actor: Actor,
        friend_id: String,
    },
    /// List the actor's friends
    List {
        #[command(flatten)]
        actor: Actor,
    },
}

#[derive(Subcommand, Debug)]
pub enum ChatCommand {
    /// Create a chat owned by the actor
    Create {
        #[command(flatten)]
        actor: Actor,
        title: String,
    },
    /// Add a member to a chat the actor owns
    AddMember {
        #[command(flatten)]
        actor: Actor,
        chat_id: String,
        user_id: String,
    },
    /// List chats owned by the actor
    List {
        #[command(flatten)]
        actor: Actor,
    },
}

/// Editable event fields shared by create, update and patch
#[derive(Args, Debug)]
pub struct EventFields {
    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    description: Option<String>,

    /// PUBLIC, FRIENDS_ONLY, SELECTED_INDIVIDUALS or SPECIFIC_CHAT
    #[arg(long)]
    visibility: Option<VisibilityKind>,

    /// Chat for SPECIFIC_CHAT events
    #[arg(long)]
    chat: Option<String>,

    /// Expire this long from now, e.g. "2h" or "3days"
    #[arg(long, value_parser = humantime::parse_duration)]
    expires_in: Option<Duration>,
}

impl EventFields {
    fn expiration_at(&self) -> Option<Timestamp> {
        self.expires_in.map(|delay| Timestamp::now().after(delay))
    }

    fn chat_id(&self) -> Option<ChatId> {
        self.chat.as_deref().map(ChatId::from)
    }
}

#[derive(Subcommand, Debug)]
pub enum EventCommand {
    /// Create an event owned by the actor
    Create {
        #[command(flatten)]
        actor: Actor,
        #[command(flatten)]
        fields: EventFields,
    },
    /// Show an event the actor may see
    Show {
        #[command(flatten)]
        actor: Actor,
        event_id: String,
    },
    /// List the actor's own events
    Mine {
        #[command(flatten)]
        actor: Actor,
    },
    /// List open events shared with the actor
    Discover {
        #[command(flatten)]
        actor: Actor,
    },
    /// Replace every editable field
    Update {
        #[command(flatten)]
        actor: Actor,
        event_id: String,
        #[command(flatten)]
        fields: EventFields,
    },
    /// Change only the given fields
    Patch {
        #[command(flatten)]
        actor: Actor,
        event_id: String,
        #[command(flatten)]
        fields: EventFields,
    },
    /// Soft-delete an event
    Remove {
        #[command(flatten)]
        actor: Actor,
        event_id: String,
    },
    /// Invite a user to a SELECTED_INDIVIDUALS event
    Invite {
        #[command(flatten)]
        actor: Actor,
        event_id: String,
        user_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModerateCommand {
    /// List every event, optionally by status
    List {
        #[command(flatten)]
        actor: Actor,
        #[arg(long)]
        status: Option<ModerationStatus>,
    },
    /// Show any event
    Show {
        #[command(flatten)]
        actor: Actor,
        event_id: String,
    },
    /// Open an unverified event to its audience
    Approve {
        #[command(flatten)]
        actor: Actor,
        event_id: String,
    },
    /// Reject an unverified event
    Reject {
        #[command(flatten)]
        actor: Actor,
        event_id: String,
    },
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| anyhow::anyhow!("--{} is required", flag))
}

fn project_all<M: EventManager>(events: &M, list: Vec<Event>) -> Result<Value> {
    let views = list
        .iter()
        .map(|event| events.project(event))
        .collect::<Result<Vec<EventView>, _>>()?;
    Ok(serde_json::to_value(views)?)
}

/// Execute a command and return its JSON output
pub fn run(command: Command, store: SqlStore, config: &Config) -> Result<Value> {
    let identity = IdentityManager::new(store.clone());
    let events = EventManagerImpl::new(store, config.events.clone());

    let output = match command {
        Command::User(command) => match command {
            UserCommand::Register { name, moderator } => {
                let role = if moderator { Role::Moderator } else { Role::Ordinary };
                serde_json::to_value(identity.register_user(name, role)?)?
            }
            UserCommand::Show { user_id } => {
                serde_json::to_value(identity.get_user(&UserId::new(user_id))?)?
            }
            UserCommand::List => serde_json::to_value(identity.list_users()?)?,
        },

        Command::Friend(command) => match command {
            FriendCommand::Add { actor, friend_id } => {
                let friend_id = UserId::new(friend_id);
                identity.add_friend(&actor.user_id(), &friend_id)?;
                json!({ "user_id": actor.id, "friend_id": friend_id })
            }
            FriendCommand::List { actor } => {
                serde_json::to_value(identity.friends(&actor.user_id())?)?
            }
        },

        Command::Chat(command) => match command {
            ChatCommand::Create { actor, title } => {
                serde_json::to_value(identity.create_chat(&actor.user_id(), title)?)?
            }
            ChatCommand::AddMember {
                actor,
                chat_id,
                user_id,
            } => serde_json::to_value(identity.add_chat_member(
                &ChatId::new(chat_id),
                &actor.user_id(),
                &UserId::new(user_id),
            )?)?,
            ChatCommand::List { actor } => {
                serde_json::to_value(identity.owned_chats(&actor.user_id())?)?
            }
        },

        Command::Event(command) => match command {
            EventCommand::Create { actor, fields } => {
                let request = NewEvent {
                    expiration_at: fields.expiration_at(),
                    allowed_chat: fields.chat_id(),
                    title: required(fields.title, "title")?,
                    description: fields.description.unwrap_or_default(),
                    visibility: required(fields.visibility, "visibility")?,
                };
                serde_json::to_value(events.create_event(&actor.user_id(), request)?)?
            }
            EventCommand::Show { actor, event_id } => {
                let event = events.get_event_for_viewer(&EventId::new(event_id), &actor.user_id())?;
                serde_json::to_value(events.project(&event)?)?
            }
            EventCommand::Mine { actor } => {
                project_all(&events, events.get_own_events(&actor.user_id())?)?
            }
            EventCommand::Discover { actor } => {
                project_all(&events, events.get_discoverable_events(&actor.user_id())?)?
            }
            EventCommand::Update {
                actor,
                event_id,
                fields,
            } => {
                let update = EventUpdate {
                    expiration_at: fields.expiration_at(),
                    allowed_chat: fields.chat_id(),
                    title: required(fields.title, "title")?,
                    description: fields.description.unwrap_or_default(),
                    visibility: required(fields.visibility, "visibility")?,
                };
                serde_json::to_value(events.update_event(
                    &EventId::new(event_id),
                    &actor.user_id(),
                    update,
                )?)?
            }
            EventCommand::Patch {
                actor,
                event_id,
                fields,
            } => {
                let patch = EventPatch {
                    expiration_at: fields.expiration_at(),
                    allowed_chat: fields.chat_id(),
                    title: fields.title,
                    description: fields.description,
                    visibility: fields.visibility,
                };
                serde_json::to_value(events.patch_event(
                    &EventId::new(event_id),
                    &actor.user_id(),
                    patch,
                )?)?
            }
            EventCommand::Remove { actor, event_id } => serde_json::to_value(
                events.remove_event(&EventId::new(event_id), &actor.user_id())?,
            )?,
            EventCommand::Invite {
                actor,
                event_id,
                user_id,
            } => serde_json::to_value(events.invite_user(
                &EventId::new(event_id),
                &actor.user_id(),
                &UserId::new(user_id),
            )?)?,
        },

        Command::Moderate(command) => match command {
            ModerateCommand::List { actor, status } => {
                project_all(&events, events.list_all_events(&actor.user_id(), status)?)?
            }
            ModerateCommand::Show { actor, event_id } => {
                let event = events.get_any_event(&actor.user_id(), &EventId::new(event_id))?;
                serde_json::to_value(events.project(&event)?)?
            }
            ModerateCommand::Approve { actor, event_id } => serde_json::to_value(
                events.change_status(
                    &EventId::new(event_id),
                    &actor.user_id(),
                    ModerationStatus::Opened,
                )?,
            )?,
            ModerateCommand::Reject { actor, event_id } => serde_json::to_value(
                events.change_status(
                    &EventId::new(event_id),
                    &actor.user_id(),
                    ModerationStatus::Rejected,
                )?,
            )?,
        },
    };

    Ok(output)
}
