//! Pinned items. These are fetched per request and never cached.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<?(https?://[^\s<>|]+)").expect("valid pin url regex"));

/// A pinned message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedMessage {
    pub ts: String,
    pub user: Option<String>,
    pub text: String,
    pub permalink: Option<String>,
}

/// A pinned file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedFile {
    pub title: String,
    pub file_type: Option<String>,
    pub mime_type: Option<String>,
    pub pretty_type: Option<String>,
    pub permalink: Option<String>,
    pub private_url: Option<String>,
    pub thumb_64: Option<String>,
}

/// A pinned item in a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub channel: String,
    pub created: i64,
    pub message: Option<PinnedMessage>,
    pub file: Option<PinnedFile>,
}

impl Pin {
    pub fn title(&self) -> &str {
        if let Some(message) = &self.message {
            return &message.text;
        }
        self.file.as_ref().map(|f| f.title.as_str()).unwrap_or_default()
    }

    /// Where selecting the pin should lead: the first link in a pinned
    /// message, otherwise the private URL of a pinned file.
    pub fn target_url(&self) -> Option<&str> {
        if let Some(message) = &self.message {
            if let Some(url) = URL_PATTERN
                .captures(&message.text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
            {
                return Some(url);
            }
        }
        self.file.as_ref().and_then(|f| f.private_url.as_deref())
    }
}
