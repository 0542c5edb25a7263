//! Visibility resolution
//!
//! Every "who can see this event" decision goes through [`VisibilityResolver`].
//! The single-event check and the bulk discovery query share one non-owner
//! predicate so they cannot disagree.

use super::event::Event;
use super::moderation::ModerationStatus;
use super::visibility::Visibility;
use crate::core_identity::User;
use crate::core_store::traits::IdentityDirectory;
use crate::core_store::types::UserId;
use crate::core_store::StoreError;
use std::collections::HashSet;

/// The set of principals an event is shared with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Members(HashSet<UserId>),
}

impl Audience {
    pub fn contains(&self, user_id: &UserId) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Members(members) => members.contains(user_id),
        }
    }
}

/// Moderators see every event through the single-item path
pub fn can_bypass_visibility(viewer: &User) -> bool {
    viewer.is_moderator()
}

/// Resolves audiences against an identity directory
pub struct VisibilityResolver<'a, D: ?Sized> {
    directory: &'a D,
}

impl<'a, D: IdentityDirectory + ?Sized> VisibilityResolver<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    /// Compute who the event is shared with, ignoring its status
    pub fn shared_audience(&self, event: &Event) -> Result<Audience, StoreError> {
        let owner = event.owner_id();

        let audience = match event.visibility() {
            Visibility::Public => Audience::Everyone,
            Visibility::FriendsOnly => {
                let mut members = self.directory.get_friends(owner)?;
                members.insert(owner.clone());
                Audience::Members(members)
            }
            Visibility::SelectedIndividuals { users } => {
                let mut members: HashSet<UserId> = users.iter().cloned().collect();
                members.insert(owner.clone());
                Audience::Members(members)
            }
            // A deleted chat shares with nobody
            Visibility::SpecificChat { chat_id } => Audience::Members(
                self.directory
                    .get_chat(chat_id)?
                    .map(|chat| chat.members.into_iter().collect())
                    .unwrap_or_default(),
            ),
        };

        Ok(audience)
    }

    /// Whether `viewer` may see `event` through the single-item path
    pub fn is_visible_to(&self, event: &Event, viewer: &User) -> Result<bool, StoreError> {
        if event.is_owned_by(&viewer.id) || can_bypass_visibility(viewer) {
            return Ok(true);
        }
        self.is_shared_with(event, &viewer.id)
    }

    /// The subset of `events` a viewer discovers as a non-owner
    ///
    /// Events the viewer owns are never part of the result and the moderator
    /// bypass does not apply.
    pub fn accessible_events(
        &self,
        events: Vec<Event>,
        viewer: &User,
    ) -> Result<Vec<Event>, StoreError> {
        let mut accessible = Vec::new();
        for event in events {
            if self.is_shared_with(&event, &viewer.id)? {
                accessible.push(event);
            }
        }
        Ok(accessible)
    }

    /// Non-owner visibility: the event is open and its audience holds the viewer
    pub fn is_shared_with(&self, event: &Event, viewer_id: &UserId) -> Result<bool, StoreError> {
        if event.is_owned_by(viewer_id) || event.status() != ModerationStatus::Opened {
            return Ok(false);
        }
        Ok(self.shared_audience(event)?.contains(viewer_id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core_event::moderation::ModerationActor;
    use crate::core_event::visibility::VisibilityKind;
    use crate::core_identity::{Chat, Role};
    use crate::core_store::types::{ChatId, Timestamp};
    use std::collections::HashMap;

    /// In-memory directory for resolver tests
    #[derive(Default)]
    pub(crate) struct TestDirectory {
        pub users: HashMap<UserId, User>,
        pub friends: HashMap<UserId, HashSet<UserId>>,
        pub chats: HashMap<ChatId, Chat>,
    }

    impl TestDirectory {
        pub fn add_user(&mut self, name: &str, role: Role) -> User {
            let user = User {
                id: UserId::new(name),
                display_name: name.to_string(),
                role,
                created_at: Timestamp::from_millis(0),
            };
            self.users.insert(user.id.clone(), user.clone());
            user
        }

        pub fn befriend(&mut self, user: &UserId, friend: &UserId) {
            self.friends.entry(user.clone()).or_default().insert(friend.clone());
        }
    }

    impl IdentityDirectory for TestDirectory {
        fn get_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
            Ok(self.users.get(user_id).cloned())
        }

        fn get_friends(&self, user_id: &UserId) -> Result<HashSet<UserId>, StoreError> {
            Ok(self.friends.get(user_id).cloned().unwrap_or_default())
        }

        fn get_chat(&self, chat_id: &ChatId) -> Result<Option<Chat>, StoreError> {
            Ok(self.chats.get(chat_id).cloned())
        }

        fn is_chat_member(&self, chat_id: &ChatId, user_id: &UserId) -> Result<bool, StoreError> {
            Ok(self
                .chats
                .get(chat_id)
                .map(|chat| chat.is_member(user_id))
                .unwrap_or(false))
        }
    }

    fn new_event(owner: &User, kind: VisibilityKind, chat: Option<ChatId>) -> Event {
        Event::create(
            owner.id.clone(),
            "Board games".to_string(),
            String::new(),
            kind,
            None,
            chat,
            Timestamp::from_millis(0),
        )
        .unwrap()
    }

    fn open(mut event: Event) -> Event {
        event
            .set_status(ModerationStatus::Opened, ModerationActor::Moderator)
            .unwrap();
        event
    }

    #[test]
    fn test_friends_audience_includes_owner_and_outgoing_friends() {
        let mut dir = TestDirectory::default();
        let alice = dir.add_user("alice", Role::Ordinary);
        let bob = dir.add_user("bob", Role::Ordinary);
        let carol = dir.add_user("carol", Role::Ordinary);
        dir.befriend(&alice.id, &bob.id);
        dir.befriend(&carol.id, &alice.id);

        let event = new_event(&alice, VisibilityKind::FriendsOnly, None);
        let audience = VisibilityResolver::new(&dir).shared_audience(&event).unwrap();

        assert!(audience.contains(&alice.id));
        assert!(audience.contains(&bob.id));
        assert!(!audience.contains(&carol.id));
    }

    #[test]
    fn test_selected_audience_always_holds_owner() {
        let mut dir = TestDirectory::default();
        let alice = dir.add_user("alice", Role::Ordinary);

        let event = new_event(&alice, VisibilityKind::SelectedIndividuals, None);
        let audience = VisibilityResolver::new(&dir).shared_audience(&event).unwrap();

        assert_eq!(audience, Audience::Members([alice.id.clone()].into_iter().collect()));
    }

    #[test]
    fn test_chat_audience_is_exactly_chat_members() {
        let mut dir = TestDirectory::default();
        let alice = dir.add_user("alice", Role::Ordinary);
        let bob = dir.add_user("bob", Role::Ordinary);

        // Chat owned by bob; alice is not a member
        let chat = Chat::new("climbing".to_string(), bob.id.clone());
        dir.chats.insert(chat.id.clone(), chat.clone());

        let event = new_event(&alice, VisibilityKind::SpecificChat, Some(chat.id.clone()));
        let audience = VisibilityResolver::new(&dir).shared_audience(&event).unwrap();

        assert!(audience.contains(&bob.id));
        assert!(!audience.contains(&alice.id));
    }

    #[test]
    fn test_missing_chat_yields_empty_audience() {
        let mut dir = TestDirectory::default();
        let alice = dir.add_user("alice", Role::Ordinary);

        let event = new_event(&alice, VisibilityKind::SpecificChat, Some(ChatId::new("gone")));
        let audience = VisibilityResolver::new(&dir).shared_audience(&event).unwrap();

        assert_eq!(audience, Audience::Members(HashSet::new()));
    }

    #[test]
    fn test_status_gates_non_owner_access() {
        let mut dir = TestDirectory::default();
        let alice = dir.add_user("alice", Role::Ordinary);
        let bob = dir.add_user("bob", Role::Ordinary);
        let resolver = VisibilityResolver::new(&dir);

        let event = new_event(&alice, VisibilityKind::Public, None);
        assert!(resolver.is_visible_to(&event, &alice).unwrap());
        assert!(!resolver.is_visible_to(&event, &bob).unwrap());

        let event = open(event);
        assert!(resolver.is_visible_to(&event, &bob).unwrap());
    }

    #[test]
    fn test_moderator_bypass_applies_to_single_item_only() {
        let mut dir = TestDirectory::default();
        let alice = dir.add_user("alice", Role::Ordinary);
        let moderator = dir.add_user("mod", Role::Moderator);
        let resolver = VisibilityResolver::new(&dir);

        let event = new_event(&alice, VisibilityKind::SelectedIndividuals, None);
        assert!(resolver.is_visible_to(&event, &moderator).unwrap());

        let open_event = open(event);
        let discovered = resolver
            .accessible_events(vec![open_event], &moderator)
            .unwrap();
        assert!(discovered.is_empty());
    }

    #[test]
    fn test_accessible_events_exclude_owned() {
        let mut dir = TestDirectory::default();
        let alice = dir.add_user("alice", Role::Ordinary);
        let bob = dir.add_user("bob", Role::Ordinary);
        let resolver = VisibilityResolver::new(&dir);

        let own = open(new_event(&alice, VisibilityKind::Public, None));
        let other = open(new_event(&bob, VisibilityKind::Public, None));

        let discovered = resolver
            .accessible_events(vec![own, other.clone()], &alice)
            .unwrap();
        assert_eq!(discovered, vec![other]);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        const USERS: [&str; 5] = ["u0", "u1", "u2", "u3", "u4"];

        #[derive(Debug, Clone)]
        struct EventSeed {
            owner: usize,
            kind: VisibilityKind,
            status: ModerationStatus,
            invitees: Vec<usize>,
            chat: usize,
        }

        fn seed_strategy() -> impl Strategy<Value = EventSeed> {
            (
                0..USERS.len(),
                prop::sample::select(VisibilityKind::ALL.to_vec()),
                prop::sample::select(ModerationStatus::ALL.to_vec()),
                prop::collection::vec(0..USERS.len(), 0..4),
                0..3usize,
            )
                .prop_map(|(owner, kind, status, invitees, chat)| EventSeed {
                    owner,
                    kind,
                    status,
                    invitees,
                    chat,
                })
        }

        fn build_event(dir: &TestDirectory, seed: &EventSeed) -> Event {
            let owner = &dir.users[&UserId::new(USERS[seed.owner])];
            // chat index 2 is never created
            let chat = ChatId::new(format!("chat-{}", seed.chat));
            let mut event = new_event(owner, seed.kind, Some(chat));
            for invitee in &seed.invitees {
                let _ = event.add_allowed_user(UserId::new(USERS[*invitee]));
            }
            Event::restore(
                event.id().clone(),
                event.title().to_string(),
                event.description().to_string(),
                event.owner_id().clone(),
                event.created_at(),
                event.expiration_at(),
                seed.status,
                event.visibility().clone(),
            )
        }

        proptest! {
            #[test]
            fn prop_bulk_query_matches_single_item_check(
                friendships in prop::collection::vec((0..USERS.len(), 0..USERS.len()), 0..10),
                chat_members in prop::collection::vec((0..2usize, 0..USERS.len()), 0..8),
                seeds in prop::collection::vec(seed_strategy(), 0..12),
                moderator in 0..USERS.len(),
            ) {
                let mut dir = TestDirectory::default();
                for (i, name) in USERS.iter().enumerate() {
                    let role = if i == moderator { Role::Moderator } else { Role::Ordinary };
                    dir.add_user(name, role);
                }
                for (from, to) in friendships {
                    if from != to {
                        dir.befriend(&UserId::new(USERS[from]), &UserId::new(USERS[to]));
                    }
                }
                for chat_index in 0..2 {
                    let mut chat = Chat::new(
                        format!("chat {}", chat_index),
                        UserId::new(USERS[chat_index]),
                    );
                    chat.id = ChatId::new(format!("chat-{}", chat_index));
                    dir.chats.insert(chat.id.clone(), chat);
                }
                for (chat_index, member) in chat_members {
                    let chat = dir.chats.get_mut(&ChatId::new(format!("chat-{}", chat_index))).unwrap();
                    let _ = chat.add_member(UserId::new(USERS[member]));
                }

                let events: Vec<Event> = seeds.iter().map(|seed| build_event(&dir, seed)).collect();
                let resolver = VisibilityResolver::new(&dir);

                for name in USERS {
                    let viewer = dir.users[&UserId::new(name)].clone();
                    let accessible = resolver.accessible_events(events.clone(), &viewer).unwrap();

                    for event in &events {
                        let non_owner_visible = !event.is_owned_by(&viewer.id)
                            && (event.status() == ModerationStatus::Opened)
                            && resolver.shared_audience(event).unwrap().contains(&viewer.id);
                        prop_assert_eq!(non_owner_visible, accessible.contains(event));

                        if !event.is_owned_by(&viewer.id) && !viewer.is_moderator() {
                            prop_assert_eq!(
                                resolver.is_visible_to(event, &viewer).unwrap(),
                                non_owner_visible
                            );
                            if event.status() != ModerationStatus::Opened {
                                prop_assert!(!resolver.is_visible_to(event, &viewer).unwrap());
                            }
                        }
                    }
                }
            }
        }
    }
}
