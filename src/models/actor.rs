//! Mutation actors and channels

use serde::{Deserialize, Serialize};
use crate::utils::errors::{CourseDeskError, Result};

/// Internal user id recorded for actors known only by their messaging-client identity
pub const EXTERNAL_ACTOR_ID: i64 = -1;

/// Origin of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Administrative web interface
    Admin,
    /// Telegram mini-app or bot chat
    Telegram,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Admin => "admin",
            Channel::Telegram => "telegram",
        }
    }

    /// Field channel edits are subject to the past-lesson lock
    pub fn is_field_channel(&self) -> bool {
        matches!(self, Channel::Telegram)
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Channel {
    type Err = CourseDeskError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Channel::Admin),
            "telegram" => Ok(Channel::Telegram),
            other => Err(CourseDeskError::Validation(format!("Unknown channel: {}", other))),
        }
    }
}

/// Who performed a mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// System user id, or [`EXTERNAL_ACTOR_ID`] for messaging-client identities
    pub user_id: i64,
    pub display_name: String,
    pub external_id: Option<String>,
}

impl Actor {
    /// Administrator with a system account
    pub fn admin(user_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            external_id: None,
        }
    }

    /// Identity authenticated only through the messaging client
    pub fn external(external_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: EXTERNAL_ACTOR_ID,
            display_name: display_name.into(),
            external_id: Some(external_id.into()),
        }
    }

    pub fn is_external(&self) -> bool {
        self.user_id == EXTERNAL_ACTOR_ID
    }

    /// Every audited actor needs a display name
    pub fn validate(&self) -> Result<()> {
        if self.display_name.trim().is_empty() {
            return Err(CourseDeskError::Validation("Actor display name is required".to_string()));
        }
        Ok(())
    }
}
