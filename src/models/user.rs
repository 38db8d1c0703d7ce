//! User and presence models.

use serde::{Deserialize, Serialize};

/// A user's active/away state as reported by the remote service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Active,
    Away,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Presence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Presence::Active => "active",
            Presence::Away => "away",
            Presence::Unknown => "unknown",
        }
    }

    /// Parse the value reported by `users.getPresence`.
    pub fn from_remote(value: &str) -> Self {
        match value {
            "active" => Presence::Active,
            "away" => Presence::Away,
            _ => Presence::Unknown,
        }
    }

    /// Value accepted by `users.setPresence`. Anything but `Active` is sent as away.
    pub fn as_setting(&self) -> &'static str {
        match self {
            Presence::Active => "auto",
            Presence::Away | Presence::Unknown => "away",
        }
    }

    /// The state a "toggle presence" action switches to.
    pub fn toggled(&self) -> Self {
        match self {
            Presence::Away => Presence::Active,
            Presence::Active | Presence::Unknown => Presence::Away,
        }
    }
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A workspace member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub real_name: String,
    pub email: Option<String>,
    pub deleted: bool,
    pub presence: Presence,
    pub status_text: String,
    pub status_emoji: String,
}

impl User {
    /// Deleted accounts and accounts without an email (bots, integrations) are
    /// hidden from listings.
    pub fn is_addressable(&self) -> bool {
        !self.deleted && self.email.as_deref().is_some_and(|e| !e.is_empty())
    }
}
