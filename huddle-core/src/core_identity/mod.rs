//! Identity model: users, friendships and chats
//!
//! Friendship and chat membership live in id-keyed relation tables behind the
//! `IdentityDirectory` trait; nothing here holds references to other users.
//! The event engine only reads from this module.

mod chat;
mod error;
mod manager;
mod user;

pub use chat::Chat;
pub use error::IdentityError;
pub use manager::IdentityManager;
pub use user::{Role, User};
