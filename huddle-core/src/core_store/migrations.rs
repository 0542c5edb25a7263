//! Database migrations for the Huddle schema
//!
//! Each migration runs in its own transaction and is recorded in the
//! `schema_version` table, so `migrate` can be called on every start.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use super::errors::StoreError;
use super::types::Timestamp;

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
    pub down_sql: Option<&'static str>,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Users, friendships, chats and events",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                display_name TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL CHECK(role IN ('ORDINARY', 'MODERATOR')),
                created_at INTEGER NOT NULL
            );

            -- Directed: user_id lists friend_id as a friend
            CREATE TABLE IF NOT EXISTS friendships (
                user_id TEXT NOT NULL,
                friend_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, friend_id),
                CHECK (user_id <> friend_id),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (friend_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_friendships_friend ON friendships(friend_id);

            CREATE TABLE IF NOT EXISTS chats (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users(id)
            );

            CREATE INDEX IF NOT EXISTS idx_chats_owner ON chats(owner_id);

            CREATE TABLE IF NOT EXISTS chat_members (
                chat_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                PRIMARY KEY (chat_id, user_id),
                FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_chat_members_user ON chat_members(user_id);

            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expiration_at INTEGER,
                status TEXT NOT NULL
                    CHECK(status IN ('UNVERIFIED', 'OPENED', 'REJECTED', 'REMOVED')),
                visibility TEXT NOT NULL
                    CHECK(visibility IN ('PUBLIC', 'FRIENDS_ONLY', 'SELECTED_INDIVIDUALS', 'SPECIFIC_CHAT')),
                allowed_chat_id TEXT,
                CHECK ((visibility = 'SPECIFIC_CHAT') = (allowed_chat_id IS NOT NULL)),
                FOREIGN KEY (owner_id) REFERENCES users(id),
                FOREIGN KEY (allowed_chat_id) REFERENCES chats(id)
            );

            CREATE INDEX IF NOT EXISTS idx_events_status ON events(status);
            CREATE INDEX IF NOT EXISTS idx_events_owner ON events(owner_id);

            -- Invite list of SELECTED_INDIVIDUALS events
            CREATE TABLE IF NOT EXISTS event_allowed_users (
                event_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                PRIMARY KEY (event_id, user_id),
                FOREIGN KEY (event_id) REFERENCES events(id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
        down_sql: Some(
            r#"
            DROP TABLE IF EXISTS event_allowed_users;
            DROP INDEX IF EXISTS idx_events_owner;
            DROP INDEX IF EXISTS idx_events_status;
            DROP TABLE IF EXISTS events;
            DROP INDEX IF EXISTS idx_chat_members_user;
            DROP TABLE IF EXISTS chat_members;
            DROP INDEX IF EXISTS idx_chats_owner;
            DROP TABLE IF EXISTS chats;
            DROP INDEX IF EXISTS idx_friendships_friend;
            DROP TABLE IF EXISTS friendships;
            DROP TABLE IF EXISTS users;
        "#,
        ),
    }]
}

/// Get current schema version from database
pub fn get_current_version(conn: &Connection) -> Result<i32, rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
        .optional()?
        .flatten();

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current_version = get_current_version(conn)?;

    let pending: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    for migration in pending {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?, ?)",
            params![
                migration.version,
                i64::try_from(Timestamp::now().as_millis()).unwrap_or(i64::MAX)
            ],
        )?;

        tx.commit()?;

        info!(
            version = migration.version,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}

/// Revert one applied migration using its `down_sql`
pub fn rollback_migration(conn: &Connection, version: i32) -> Result<(), StoreError> {
    let migration = get_migrations()
        .into_iter()
        .find(|m| m.version == version)
        .ok_or_else(|| StoreError::Migration(format!("migration {} not found", version)))?;

    let down_sql = migration.down_sql.ok_or_else(|| {
        StoreError::Migration(format!("no rollback available for version {}", version))
    })?;

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(down_sql)?;
    tx.execute("DELETE FROM schema_version WHERE version = ?", params![version])?;
    tx.commit()?;

    info!(version, "rolled back migration");
    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}
