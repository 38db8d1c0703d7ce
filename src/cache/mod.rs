//! Snapshot cache.
//!
//! The snapshot is the single aggregate of remote state the workflow serves
//! every command from. It is persisted as JSON after every mutation. Loading is
//! lenient (a missing or corrupt file is an empty cache), saving is not.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppResult;
use crate::models::{emoji_name, Channel, Emoji, Identity, Presence, User};

/// Last-known state of the workspace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    /// When the last primary merge completed; `None` if never
    pub fetched_at: Option<DateTime<Utc>>,
    /// When presence was last fetched; `None` if never
    pub presence_fetched_at: Option<DateTime<Utc>>,
    pub identity: Identity,
    pub channels: Vec<Channel>,
    pub users: Vec<User>,
    pub emoji: Vec<Emoji>,
}

impl Snapshot {
    /// Load a persisted snapshot. Missing or unreadable files yield an empty one.
    pub async fn load(path: &Path) -> Self {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("No snapshot at {:?}: {}", path, e);
                return Self::default();
            }
        };

        match serde_json::from_slice(&data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Discarding corrupt snapshot {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Persist the snapshot. Writes a sibling temp file and renames it into
    /// place so a crash never leaves a half-written cache behind.
    pub async fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec(self)?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, path).await?;

        tracing::debug!(
            "Saved snapshot to {:?} ({} channels, {} users)",
            path,
            self.channels.len(),
            self.users.len()
        );
        Ok(())
    }

    /// Remove the persisted snapshot. A missing file is not an error.
    pub async fn erase(path: &Path) -> AppResult<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// True when the snapshot was never fetched or is older than `threshold`.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        is_older_than(self.fetched_at, now, threshold)
    }

    /// Same rule as [`Snapshot::is_stale`] applied to the presence timestamp.
    pub fn is_presence_stale(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        is_older_than(self.presence_fetched_at, now, threshold)
    }

    pub fn index_of_user(&self, id: &str) -> Option<usize> {
        self.users.iter().position(|u| u.id == id)
    }

    pub fn find_user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Look up a custom emoji by name; `:name:` references are accepted.
    pub fn find_emoji(&self, reference: &str) -> Option<&Emoji> {
        let name = emoji_name(reference);
        self.emoji.iter().find(|e| e.name == name)
    }

    /// The authenticated user's entry, once the cache is populated.
    pub fn current_user(&self) -> Option<&User> {
        if self.identity.user_id.is_empty() {
            return None;
        }
        self.find_user(&self.identity.user_id)
    }

    pub fn current_user_mut(&mut self) -> Option<&mut User> {
        let idx = self.index_of_user(&self.identity.user_id)?;
        self.users.get_mut(idx)
    }

    /// Replace the primary fields with a freshly fetched set. Entries are
    /// de-duplicated by id (first wins), and presence already known for a user
    /// carries over when the listing did not report one.
    pub fn merge_primary(
        &mut self,
        identity: Identity,
        channels: Vec<Channel>,
        users: Vec<User>,
        now: DateTime<Utc>,
    ) {
        let known: HashMap<&str, Presence> = self
            .users
            .iter()
            .filter(|u| u.presence != Presence::Unknown)
            .map(|u| (u.id.as_str(), u.presence))
            .collect();

        let mut seen = HashSet::new();
        let users: Vec<User> = users
            .into_iter()
            .filter(|u| seen.insert(u.id.clone()))
            .map(|mut u| {
                if u.presence == Presence::Unknown {
                    if let Some(presence) = known.get(u.id.as_str()) {
                        u.presence = *presence;
                    }
                }
                u
            })
            .collect();

        let mut seen = HashSet::new();
        let channels: Vec<Channel> = channels
            .into_iter()
            .filter(|c| seen.insert(c.id.clone()))
            .collect();

        self.identity = identity;
        self.channels = channels;
        self.users = users;
        self.fetched_at = Some(now);
    }

    /// Apply a completed presence round. Ids no longer in the user list are
    /// ignored.
    pub fn apply_presence(&mut self, presences: Vec<(String, Presence)>, now: DateTime<Utc>) {
        for (id, presence) in presences {
            if let Some(idx) = self.index_of_user(&id) {
                self.users[idx].presence = presence;
            }
        }
        self.presence_fetched_at = Some(now);
    }
}

fn is_older_than(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    match timestamp {
        None => true,
        Some(at) => now.signed_duration_since(at) > threshold,
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
