//! Moderation lifecycle of an event
//!
//! ```text
//! UNVERIFIED --moderator--> OPENED | REJECTED
//! UNVERIFIED | OPENED | REJECTED --owner--> REMOVED
//! ```
//!
//! OPENED, REJECTED and REMOVED never go back to UNVERIFIED.

use super::error::EventError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationStatus {
    /// Awaiting review; visible to the owner only
    Unverified,
    /// Approved and discoverable by its audience
    Opened,
    /// Declined by a moderator
    Rejected,
    /// Soft-deleted by the owner
    Removed,
}

/// Who is asking for a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationActor {
    Moderator,
    Owner,
}

impl ModerationStatus {
    pub const ALL: [ModerationStatus; 4] = [
        ModerationStatus::Unverified,
        ModerationStatus::Opened,
        ModerationStatus::Rejected,
        ModerationStatus::Removed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationStatus::Unverified => "UNVERIFIED",
            ModerationStatus::Opened => "OPENED",
            ModerationStatus::Rejected => "REJECTED",
            ModerationStatus::Removed => "REMOVED",
        }
    }

    /// Validate a move from `self` to `to` requested by `actor`
    pub fn transition(
        self,
        to: ModerationStatus,
        actor: ModerationActor,
    ) -> Result<ModerationStatus, EventError> {
        use ModerationActor::*;
        use ModerationStatus::*;

        if self == to {
            return Err(EventError::Validation(format!("event is already {}", to)));
        }

        match (actor, self, to) {
            (Moderator, Unverified, Opened | Rejected) => Ok(to),
            (Moderator, _, Opened | Rejected) => Err(EventError::InvalidState(format!(
                "a {} event cannot be moderated again",
                self
            ))),
            (Owner, Unverified | Opened | Rejected, Removed) => Ok(to),
            (Owner, _, Opened | Rejected) => Err(EventError::Authorization(
                "only moderators can approve or reject events".to_string(),
            )),
            _ => Err(EventError::InvalidState(format!(
                "cannot move event from {} to {}",
                self, to
            ))),
        }
    }
}

impl fmt::Display for ModerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModerationStatus {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        ModerationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| EventError::Validation(format!("unknown status '{}'", s)))
    }
}
