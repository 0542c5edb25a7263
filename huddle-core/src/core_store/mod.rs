/*
    core_store - Persistence layer for Huddle

    Handles:
    - Shared identifiers and timestamps
    - The collaborator traits the engine reads through
    - SQLite storage with versioned migrations
*/

pub mod errors;
pub mod migrations;
pub mod sql_store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use errors::StoreError;
pub use sql_store::SqlStore;
pub use traits::{EventStore, IdentityDirectory, IdentityStore};
pub use types::{ChatId, EventId, Timestamp, UserId};
