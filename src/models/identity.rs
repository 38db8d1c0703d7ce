//! The authenticated actor.

use serde::{Deserialize, Serialize};

/// Identity returned by `auth.test` for the stored token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Identity {
    pub user_id: String,
    pub team_id: String,
    pub team_name: String,
    pub user_name: String,
    /// Workspace URL, e.g. `https://acme.slack.com/`
    pub url: String,
}

impl Identity {
    /// Whether `user_id` is the authenticated user. Always false before the
    /// first refresh.
    pub fn is_current_user(&self, user_id: &str) -> bool {
        !self.user_id.is_empty() && self.user_id == user_id
    }

    /// Deep link that opens a channel (or DM) in the desktop app.
    pub fn channel_link(&self, channel_id: &str) -> String {
        format!("slack://channel?team={}&id={}", self.team_id, channel_id)
    }

    /// Deep link that opens a user's profile in the desktop app.
    pub fn user_link(&self, user_id: &str) -> String {
        format!("slack://user?team={}&id={}", self.team_id, user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_use_team_id() {
        let identity = Identity {
            user_id: "U1".to_string(),
            team_id: "T9".to_string(),
            ..Default::default()
        };
        assert_eq!(identity.channel_link("C1"), "slack://channel?team=T9&id=C1");
        assert_eq!(identity.user_link("U2"), "slack://user?team=T9&id=U2");
    }

    #[test]
    fn test_empty_identity_matches_nobody() {
        let identity = Identity::default();
        assert!(!identity.is_current_user(""));
        assert!(!identity.is_current_user("U1"));
    }
}
