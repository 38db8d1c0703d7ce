//! Persisted API token.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::AppResult;

/// The stored API token. A missing token means token entry should be offered
/// instead of data commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "api_key", default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl Credentials {
    /// Load the token file. A missing or unreadable file yields no token.
    pub async fn load(path: &Path) -> Self {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("No credentials at {:?}: {}", path, e);
                return Self::default();
            }
        };

        serde_json::from_slice(&data).unwrap_or_else(|e| {
            tracing::warn!("Ignoring unreadable credentials file {:?}: {}", path, e);
            Self::default()
        })
    }

    /// Write the token file, creating the parent directory if needed.
    pub async fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// The token, if one is stored and non-empty.
    pub fn token(&self) -> Option<&str> {
        self.api_token.as_deref().filter(|t| !t.trim().is_empty())
    }
}
