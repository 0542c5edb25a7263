//! Huddle core: users, chats and events with visibility-based access control

pub mod config;
pub mod core_event;
pub mod core_identity;
pub mod core_store;
pub mod logging;
pub mod metrics;

pub use config::Config;
pub use core_event::{EventError, EventManager, EventManagerImpl};
pub use core_identity::{IdentityError, IdentityManager};
pub use core_store::{SqlStore, StoreError};
pub use logging::{init_logging, LogLevel};
