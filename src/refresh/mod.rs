//! Refresh coordinator.
//!
//! Fetches identity, channels and users concurrently and merges them into the
//! snapshot only once all three have succeeded. A second round enriches every
//! user with their presence. Fetch tasks only return values; every write to
//! the snapshot happens here, on the task that holds `&mut Snapshot`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::api::SlackApi;
use crate::cache::Snapshot;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, Identity, Presence, User};

/// What `ensure_fresh` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The snapshot was recent enough; nothing was fetched.
    Fresh,
    /// A full refresh ran and the snapshot was persisted.
    Refreshed,
}

/// Coordinates concurrent fetches into a single snapshot.
#[derive(Clone)]
pub struct Coordinator {
    api: Arc<dyn SlackApi>,
    snapshot_path: PathBuf,
    stale_after: Duration,
    presence_stale_after: Duration,
    presence_concurrency: Option<usize>,
}

impl Coordinator {
    pub fn new(api: Arc<dyn SlackApi>, snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            api,
            snapshot_path: snapshot_path.into(),
            stale_after: Duration::minutes(5),
            presence_stale_after: Duration::minutes(1),
            presence_concurrency: None,
        }
    }

    pub fn from_config(api: Arc<dyn SlackApi>, config: &Config) -> Self {
        Self {
            stale_after: config.stale_after(),
            presence_stale_after: config.presence_stale_after(),
            presence_concurrency: config.presence_concurrency,
            ..Self::new(api, config.snapshot_file())
        }
    }

    /// Cap the number of presence fetches in flight at once.
    pub fn with_presence_concurrency(mut self, limit: usize) -> Self {
        self.presence_concurrency = Some(limit.max(1));
        self
    }

    pub fn snapshot_path(&self) -> &std::path::Path {
        &self.snapshot_path
    }

    /// Refresh the snapshot if it is stale, otherwise do nothing.
    pub async fn ensure_fresh(
        &self,
        token: &str,
        snapshot: &mut Snapshot,
        now: DateTime<Utc>,
    ) -> AppResult<RefreshOutcome> {
        if !snapshot.is_stale(now, self.stale_after) {
            return Ok(RefreshOutcome::Fresh);
        }

        tracing::info!("Refreshing cache...");
        self.refresh(token, snapshot, now).await?;
        Ok(RefreshOutcome::Refreshed)
    }

    /// Run a full refresh.
    ///
    /// The primary merge (identity, channels, users) is all-or-nothing: if any
    /// of the three fetches fails, the snapshot is left exactly as it was and
    /// the first error is returned. Presence enrichment runs afterwards and is
    /// also all-or-nothing, but its failure does not undo the primary merge;
    /// the snapshot is persisted either way and the enrichment error returned.
    pub async fn refresh(
        &self,
        token: &str,
        snapshot: &mut Snapshot,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let (identity, channels, users) = match self.fetch_primary(token).await {
            Ok(primary) => primary,
            Err(e) => {
                tracing::error!("Error refreshing cache: {}", e);
                return Err(e);
            }
        };

        snapshot.merge_primary(identity, channels, users, now);
        tracing::info!(
            "Merged {} channels and {} users",
            snapshot.channels.len(),
            snapshot.users.len()
        );

        let user_ids: Vec<String> = snapshot.users.iter().map(|u| u.id.clone()).collect();
        match self.fetch_presence(token, user_ids).await {
            Ok(presences) => {
                tracing::debug!("Got presence for {} users", presences.len());
                snapshot.apply_presence(presences, now);
            }
            Err(e) => {
                tracing::warn!("Presence enrichment failed, keeping primary merge: {}", e);
                snapshot.save(&self.snapshot_path).await?;
                return Err(e);
            }
        }

        snapshot.save(&self.snapshot_path).await
    }

    /// The three primary fetches, run concurrently. The first failure wins and
    /// the remaining futures are dropped.
    async fn fetch_primary(&self, token: &str) -> AppResult<(Identity, Vec<Channel>, Vec<User>)> {
        let (identity, channels, users) = tokio::try_join!(
            async {
                let identity = self.api.get_identity(token).await?;
                tracing::debug!("Got auth");
                Ok::<_, AppError>(identity)
            },
            async {
                let channels = self.api.list_channels(token).await?;
                tracing::debug!("Got channels");
                Ok::<_, AppError>(channels)
            },
            async {
                let users = self.api.list_users(token).await?;
                tracing::debug!("Got users");
                Ok::<_, AppError>(users)
            },
        )?;

        Ok((identity, channels, users))
    }

    /// One task per user. Results come back through the join set; on the first
    /// error the set is dropped, which aborts the outstanding fetches.
    async fn fetch_presence(
        &self,
        token: &str,
        user_ids: Vec<String>,
    ) -> AppResult<Vec<(String, Presence)>> {
        let limiter = self.presence_concurrency.map(|n| Arc::new(Semaphore::new(n)));
        let mut tasks = JoinSet::new();

        for user_id in user_ids {
            let api = Arc::clone(&self.api);
            let token = token.to_string();
            let limiter = limiter.clone();

            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => Some(
                        limiter
                            .acquire_owned()
                            .await
                            .map_err(|e| AppError::Task(e.to_string()))?,
                    ),
                    None => None,
                };
                let presence = api.get_presence(&token, &user_id).await?;
                Ok::<_, AppError>((user_id, presence))
            });
        }

        let mut presences = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            presences.push(joined??);
        }
        Ok(presences)
    }

    /// Re-fetch the authenticated user's own presence when it is unknown or
    /// older than the presence threshold.
    pub async fn refresh_own_presence(
        &self,
        token: &str,
        snapshot: &mut Snapshot,
        now: DateTime<Utc>,
    ) -> AppResult<Presence> {
        let user_id = snapshot.identity.user_id.clone();
        let idx = snapshot
            .index_of_user(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("current user {:?} not cached", user_id)))?;

        let cached = snapshot.users[idx].presence;
        if cached != Presence::Unknown && !snapshot.is_presence_stale(now, self.presence_stale_after)
        {
            return Ok(cached);
        }

        let presence = self.api.get_presence(token, &user_id).await?;
        snapshot.users[idx].presence = presence;
        snapshot.presence_fetched_at = Some(now);
        snapshot.save(&self.snapshot_path).await?;
        Ok(presence)
    }

    /// Fetch the custom emoji list if the snapshot has none yet.
    pub async fn ensure_emoji(&self, token: &str, snapshot: &mut Snapshot) -> AppResult<()> {
        if !snapshot.emoji.is_empty() {
            return Ok(());
        }

        let emoji = self.api.list_emoji(token).await?;
        tracing::info!("Got {} custom emoji", emoji.len());
        snapshot.emoji = emoji;
        snapshot.save(&self.snapshot_path).await
    }
}
