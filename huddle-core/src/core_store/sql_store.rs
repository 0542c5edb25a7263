//! SQLite-backed implementation of the identity and event stores

use super::errors::StoreError;
use super::migrations;
use super::traits::{EventStore, IdentityDirectory, IdentityStore};
use super::types::{ChatId, EventId, Timestamp, UserId};
use crate::config::StoreConfig;
use crate::core_event::{Event, ModerationStatus, Visibility, VisibilityKind};
use crate::core_identity::{Chat, Role, User};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

const EVENT_COLUMNS: &str = "id, title, description, owner_id, created_at, expiration_at, \
                             status, visibility, allowed_chat_id";

/// SQL-based storage for users, chats and events
///
/// Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct SqlStore {
    pool: Pool<SqliteConnectionManager>,
}

fn to_timestamp(millis: i64) -> Result<Timestamp, StoreError> {
    u64::try_from(millis)
        .map(Timestamp::from_millis)
        .map_err(|_| StoreError::corrupted(format!("negative timestamp {}", millis)))
}

/// SQLite integers are signed, so timestamps past `i64::MAX` cannot be stored
fn to_sql_millis(at: Timestamp) -> Result<i64, StoreError> {
    i64::try_from(at.as_millis())
        .map_err(|_| StoreError::corrupted(format!("timestamp {} is out of range", at)))
}

fn first_column(row: &Row<'_>) -> rusqlite::Result<String> {
    row.get(0)
}

/// Raw `events` row before its invite list is attached
struct EventRow {
    id: String,
    title: String,
    description: String,
    owner_id: String,
    created_at: i64,
    expiration_at: Option<i64>,
    status: String,
    visibility: String,
    allowed_chat_id: Option<String>,
}

impl EventRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(EventRow {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            owner_id: row.get(3)?,
            created_at: row.get(4)?,
            expiration_at: row.get(5)?,
            status: row.get(6)?,
            visibility: row.get(7)?,
            allowed_chat_id: row.get(8)?,
        })
    }
}

impl SqlStore {
    /// Create a store over an existing pool, applying pending migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> Result<Self, StoreError> {
        {
            let conn = pool.get()?;
            migrations::migrate(&conn)?;
        }
        Ok(Self { pool })
    }

    /// Open (or create) the database file named in the configuration
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let busy_timeout = config.busy_timeout;
        let manager = SqliteConnectionManager::file(&config.database_path).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
        });

        let pool = Pool::builder().max_size(config.pool_size).build(manager)?;

        debug!(path = %config.database_path.display(), "opened database");
        Self::new(pool)
    }

    /// Create a new in-memory store
    ///
    /// Every in-memory connection is its own database, so the pool holds
    /// exactly one.
    pub fn memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
        let pool = Pool::builder().max_size(1).build(manager)?;

        Self::new(pool)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        Ok(self.pool.get()?)
    }

    // ===== Row loading =====

    fn load_user(conn: &Connection, user_id: &str) -> Result<Option<User>, StoreError> {
        let row = conn
            .query_row(
                "SELECT id, display_name, role, created_at FROM users WHERE id = ?",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, display_name, role, created_at)| -> Result<User, StoreError> {
            let role: Role = role
                .parse()
                .map_err(|_| StoreError::corrupted(format!("user {} has role '{}'", id, role)))?;
            Ok(User {
                id: UserId::new(id),
                display_name,
                role,
                created_at: to_timestamp(created_at)?,
            })
        })
        .transpose()
    }

    fn load_users(conn: &Connection, sql: &str, arg: Option<&str>) -> Result<Vec<User>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map(params_from_iter(arg), first_column)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = Self::load_user(conn, &id)? {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn load_chat(conn: &Connection, chat_id: &str) -> Result<Option<Chat>, StoreError> {
        let row = conn
            .query_row(
                "SELECT id, title, owner_id, created_at FROM chats WHERE id = ?",
                params![chat_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, title, owner_id, created_at)) = row else {
            return Ok(None);
        };
        let mut chat = Chat {
            id: ChatId::new(id),
            title,
            owner_id: UserId::new(owner_id),
            members: BTreeSet::new(),
            created_at: to_timestamp(created_at)?,
        };

        let mut stmt = conn.prepare("SELECT user_id FROM chat_members WHERE chat_id = ?")?;
        chat.members = stmt
            .query_map(params![chat_id], |row| Ok(UserId::new(row.get::<_, String>(0)?)))?
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Some(chat))
    }

    fn load_chats(conn: &Connection, sql: &str, arg: Option<&str>) -> Result<Vec<Chat>, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map(params_from_iter(arg), first_column)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut chats = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(chat) = Self::load_chat(conn, &id)? {
                chats.push(chat);
            }
        }
        Ok(chats)
    }

    fn decode_event(conn: &Connection, row: EventRow) -> Result<Event, StoreError> {
        let status: ModerationStatus = row.status.parse().map_err(|_| {
            StoreError::corrupted(format!("event {} has status '{}'", row.id, row.status))
        })?;
        let kind: VisibilityKind = row.visibility.parse().map_err(|_| {
            StoreError::corrupted(format!("event {} has visibility '{}'", row.id, row.visibility))
        })?;

        let visibility = match kind {
            VisibilityKind::Public => Visibility::Public,
            VisibilityKind::FriendsOnly => Visibility::FriendsOnly,
            VisibilityKind::SelectedIndividuals => {
                let mut stmt =
                    conn.prepare("SELECT user_id FROM event_allowed_users WHERE event_id = ?")?;
                let users = stmt
                    .query_map(params![row.id], |r| Ok(UserId::new(r.get::<_, String>(0)?)))?
                    .collect::<Result<BTreeSet<_>, _>>()?;
                Visibility::SelectedIndividuals { users }
            }
            VisibilityKind::SpecificChat => {
                let chat_id = row.allowed_chat_id.ok_or_else(|| {
                    StoreError::corrupted(format!("chat event {} has no chat", row.id))
                })?;
                Visibility::SpecificChat {
                    chat_id: ChatId::new(chat_id),
                }
            }
        };

        Ok(Event::restore(
            EventId::new(row.id),
            row.title,
            row.description,
            UserId::new(row.owner_id),
            to_timestamp(row.created_at)?,
            row.expiration_at.map(to_timestamp).transpose()?,
            status,
            visibility,
        ))
    }

    fn load_events(conn: &Connection, filter: &str, arg: Option<&str>) -> Result<Vec<Event>, StoreError> {
        let sql = format!(
            "SELECT {} FROM events {} ORDER BY created_at, id",
            EVENT_COLUMNS, filter
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(arg), EventRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|row| Self::decode_event(conn, row))
            .collect()
    }
}

impl IdentityDirectory for SqlStore {
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        let conn = self.conn()?;
        Self::load_user(&conn, user_id.as_str())
    }

    fn get_friends(&self, user_id: &UserId) -> Result<HashSet<UserId>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT friend_id FROM friendships WHERE user_id = ?")?;
        let friends = stmt
            .query_map(params![user_id.as_str()], |row| {
                Ok(UserId::new(row.get::<_, String>(0)?))
            })?
            .collect::<Result<HashSet<_>, _>>()?;
        Ok(friends)
    }

    fn get_chat(&self, chat_id: &ChatId) -> Result<Option<Chat>, StoreError> {
        let conn = self.conn()?;
        Self::load_chat(&conn, chat_id.as_str())
    }

    fn is_chat_member(&self, chat_id: &ChatId, user_id: &UserId) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let member = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM chat_members WHERE chat_id = ? AND user_id = ?)",
            params![chat_id.as_str(), user_id.as_str()],
            |row| row.get(0),
        )?;
        Ok(member)
    }
}

impl IdentityStore for SqlStore {
    fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, display_name, role, created_at) VALUES (?, ?, ?, ?)",
            params![
                user.id.as_str(),
                &user.display_name,
                user.role.as_str(),
                to_sql_millis(user.created_at)?,
            ],
        )?;
        Ok(())
    }

    fn find_user_by_name(&self, display_name: &str) -> Result<Option<User>, StoreError> {
        let conn = self.conn()?;
        let id: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE display_name = ?",
                params![display_name],
                |row| row.get(0),
            )
            .optional()?;

        match id {
            Some(id) => Self::load_user(&conn, &id),
            None => Ok(None),
        }
    }

    fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.conn()?;
        Self::load_users(&conn, "SELECT id FROM users ORDER BY display_name", None)
    }

    fn add_friend(&self, user_id: &UserId, friend_id: &UserId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO friendships (user_id, friend_id, created_at) VALUES (?, ?, ?)",
            params![
                user_id.as_str(),
                friend_id.as_str(),
                to_sql_millis(Timestamp::now())?,
            ],
        )?;
        Ok(())
    }

    fn save_chat(&self, chat: &Chat) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO chats (id, title, owner_id, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET title = excluded.title",
            params![
                chat.id.as_str(),
                &chat.title,
                chat.owner_id.as_str(),
                to_sql_millis(chat.created_at)?,
            ],
        )?;

        tx.execute(
            "DELETE FROM chat_members WHERE chat_id = ?",
            params![chat.id.as_str()],
        )?;
        for user_id in &chat.members {
            tx.execute(
                "INSERT INTO chat_members (chat_id, user_id) VALUES (?, ?)",
                params![chat.id.as_str(), user_id.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn list_chats(&self) -> Result<Vec<Chat>, StoreError> {
        let conn = self.conn()?;
        Self::load_chats(&conn, "SELECT id FROM chats ORDER BY created_at, id", None)
    }

    fn chats_owned_by(&self, owner_id: &UserId) -> Result<Vec<Chat>, StoreError> {
        let conn = self.conn()?;
        Self::load_chats(
            &conn,
            "SELECT id FROM chats WHERE owner_id = ? ORDER BY created_at, id",
            Some(owner_id.as_str()),
        )
    }
}

impl EventStore for SqlStore {
    fn save_event(&self, event: &Event) -> Result<(), StoreError> {
        let created_at = to_sql_millis(event.created_at())?;
        let expiration_at = event.expiration_at().map(to_sql_millis).transpose()?;

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO events (id, title, description, owner_id, created_at, expiration_at,
                                 status, visibility, allowed_chat_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 expiration_at = excluded.expiration_at,
                 status = excluded.status,
                 visibility = excluded.visibility,
                 allowed_chat_id = excluded.allowed_chat_id",
            params![
                event.id().as_str(),
                event.title(),
                event.description(),
                event.owner_id().as_str(),
                created_at,
                expiration_at,
                event.status().as_str(),
                event.visibility().kind().as_str(),
                event.visibility().allowed_chat().map(|chat| chat.as_str()),
            ],
        )?;

        tx.execute(
            "DELETE FROM event_allowed_users WHERE event_id = ?",
            params![event.id().as_str()],
        )?;
        for user_id in event.visibility().allowed_users().into_iter().flatten() {
            tx.execute(
                "INSERT INTO event_allowed_users (event_id, user_id) VALUES (?, ?)",
                params![event.id().as_str(), user_id.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn find_event(&self, event_id: &EventId) -> Result<Option<Event>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS),
                params![event_id.as_str()],
                EventRow::from_row,
            )
            .optional()?;

        row.map(|row| Self::decode_event(&conn, row)).transpose()
    }

    fn find_all_events(&self) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn()?;
        Self::load_events(&conn, "", None)
    }

    fn find_events_by_status(&self, status: ModerationStatus) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn()?;
        Self::load_events(&conn, "WHERE status = ?", Some(status.as_str()))
    }

    fn find_events_by_owner(&self, owner_id: &UserId) -> Result<Vec<Event>, StoreError> {
        let conn = self.conn()?;
        Self::load_events(&conn, "WHERE owner_id = ?", Some(owner_id.as_str()))
    }
}
