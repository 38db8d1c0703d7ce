//! Configuration module for the Slack workflow.
//!
//! Runtime settings come from environment variables with sensible defaults. The
//! API token is persisted separately in a small JSON file (see [`Credentials`]).

mod credentials;

pub use credentials::*;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Slack Web API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api";

/// Snapshot age, in minutes, after which a refresh runs.
pub const DEFAULT_STALE_MINUTES: i64 = 5;

/// Own-presence age, in minutes, after which it is re-fetched.
pub const DEFAULT_PRESENCE_STALE_MINUTES: i64 = 1;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding persistent workflow data (the token file)
    pub data_dir: PathBuf,
    /// Directory holding the snapshot file and downloaded emoji images
    pub cache_dir: PathBuf,
    /// Base URL of the Slack Web API, without trailing slash
    pub api_base_url: String,
    /// Per-request timeout; `None` leaves the transport defaults in place
    pub http_timeout: Option<Duration>,
    /// Age after which the snapshot is refreshed
    pub stale_minutes: i64,
    /// Age after which the current user's own presence is re-fetched
    pub presence_stale_minutes: i64,
    /// Upper bound on concurrent presence fetches; `None` means one per user
    pub presence_concurrency: Option<usize>,
    /// Bundled sprite index (`short_name`, `sheet_x`, `sheet_y`)
    pub sprite_index_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let data_dir = env::var("SLACK_DATA_DIR")
            .unwrap_or_else(|_| "./data".to_string())
            .into();

        let cache_dir = env::var("SLACK_CACHE_DIR")
            .unwrap_or_else(|_| "./cache".to_string())
            .into();

        let api_base_url = env::var("SLACK_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());

        let http_timeout = env::var("SLACK_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let stale_minutes = env::var("SLACK_STALE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|m| *m >= 0)
            .unwrap_or(DEFAULT_STALE_MINUTES);

        let presence_stale_minutes = env::var("SLACK_PRESENCE_STALE_MINUTES")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|m| *m >= 0)
            .unwrap_or(DEFAULT_PRESENCE_STALE_MINUTES);

        let presence_concurrency = env::var("SLACK_PRESENCE_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0);

        let sprite_index_path = env::var("SLACK_SPRITE_INDEX")
            .unwrap_or_else(|_| "./emoji.json".to_string())
            .into();

        let log_level = env::var("SLACK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            data_dir,
            cache_dir,
            api_base_url,
            http_timeout,
            stale_minutes,
            presence_stale_minutes,
            presence_concurrency,
            sprite_index_path,
            log_level,
        }
    }

    /// Path of the persisted token file.
    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Path of the persisted snapshot.
    pub fn snapshot_file(&self) -> PathBuf {
        self.cache_dir.join("cache.json")
    }

    /// Directory downloaded and sliced emoji images are written to.
    pub fn emoji_dir(&self) -> PathBuf {
        self.cache_dir.join("emoji")
    }

    /// Out-of-range values fall back to the default threshold.
    pub fn stale_after(&self) -> chrono::Duration {
        minutes_or(self.stale_minutes, DEFAULT_STALE_MINUTES)
    }

    pub fn presence_stale_after(&self) -> chrono::Duration {
        minutes_or(self.presence_stale_minutes, DEFAULT_PRESENCE_STALE_MINUTES)
    }
}

fn minutes_or(minutes: i64, default: i64) -> chrono::Duration {
    chrono::Duration::try_minutes(minutes)
        .filter(|d| *d >= chrono::Duration::zero())
        .unwrap_or_else(|| chrono::Duration::minutes(default))
}
