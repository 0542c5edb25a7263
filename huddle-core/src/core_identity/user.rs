//! User data structures

use crate::core_store::types::{Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::IdentityError;

/// A registered user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,

    /// Human-readable, unique name
    pub display_name: String,

    /// Platform role
    pub role: Role,

    /// When the user registered
    pub created_at: Timestamp,
}

impl User {
    /// Create a new User with a fresh ID
    pub fn new(display_name: String, role: Role) -> Self {
        User {
            id: UserId::generate(),
            display_name,
            role,
            created_at: Timestamp::now(),
        }
    }

    pub fn is_moderator(&self) -> bool {
        self.role == Role::Moderator
    }
}

/// Platform-level roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular member of the network
    Ordinary,
    /// Can approve or reject events and see everything
    Moderator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Ordinary => "ORDINARY",
            Role::Moderator => "MODERATOR",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ORDINARY" => Ok(Role::Ordinary),
            "MODERATOR" => Ok(Role::Moderator),
            other => Err(IdentityError::Validation(format!("unknown role '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user() {
        let user = User::new("alice".to_string(), Role::Ordinary);
        assert_eq!(user.display_name, "alice");
        assert!(!user.is_moderator());
    }

    #[test]
    fn test_role_round_trip_through_str() {
        assert_eq!("moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert_eq!(Role::Ordinary.to_string().parse::<Role>().unwrap(), Role::Ordinary);
        assert!("admin".parse::<Role>().is_err());
    }
}
