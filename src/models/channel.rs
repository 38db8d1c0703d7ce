//! Channel model.

use serde::{Deserialize, Serialize};

/// A non-archived channel and its membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub member_ids: Vec<String>,
    pub topic: String,
    pub purpose: String,
}

impl Channel {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == user_id)
    }
}
