//! Session context.
//!
//! A [`Session`] is built once at process start and owns everything the
//! command layer works with: configuration, the stored token, the snapshot and
//! the API client. It is the only owner of the snapshot; every mutation goes
//! through it and is persisted immediately.

use std::sync::Arc;

use chrono::Utc;

use crate::api::SlackApi;
use crate::cache::Snapshot;
use crate::config::{Config, Credentials};
use crate::emoji::{EmojiImage, EmojiStore};
use crate::errors::{AppError, AppResult};
use crate::models::{Pin, Presence};
use crate::refresh::{Coordinator, RefreshOutcome};

pub struct Session {
    config: Arc<Config>,
    api: Arc<dyn SlackApi>,
    coordinator: Coordinator,
    emoji: EmojiStore,
    credentials: Credentials,
    snapshot: Snapshot,
}

impl Session {
    /// Load the stored token and snapshot. Neither being present is an error.
    pub async fn open(config: Config, api: Arc<dyn SlackApi>) -> Self {
        let credentials = Credentials::load(&config.config_file()).await;
        let snapshot = Snapshot::load(&config.snapshot_file()).await;
        tracing::debug!(
            "Opened session (token: {}, cached users: {})",
            credentials.token().is_some(),
            snapshot.users.len()
        );

        let coordinator = Coordinator::from_config(api.clone(), &config);
        let emoji = EmojiStore::new(
            config.emoji_dir(),
            config.sprite_index_path.clone(),
            api.clone(),
        );

        Self {
            config: Arc::new(config),
            api,
            coordinator,
            emoji,
            credentials,
            snapshot,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Without a token only token entry makes sense.
    pub fn has_token(&self) -> bool {
        self.credentials.token().is_some()
    }

    /// Store a new token. The cached snapshot may belong to another workspace,
    /// so it is marked stale.
    pub async fn set_token(&mut self, token: &str) -> AppResult<()> {
        self.credentials.api_token = Some(token.trim().to_string());
        self.credentials.save(&self.config.config_file()).await?;
        tracing::info!("Token saved");

        self.snapshot.fetched_at = None;
        self.snapshot.save(&self.config.snapshot_file()).await
    }

    /// Refresh the snapshot if it is older than the staleness threshold.
    pub async fn ensure_fresh(&mut self) -> AppResult<RefreshOutcome> {
        let token = require_token(&self.credentials)?;
        self.coordinator
            .ensure_fresh(token, &mut self.snapshot, Utc::now())
            .await
    }

    /// Refresh regardless of age.
    pub async fn refresh(&mut self) -> AppResult<()> {
        let token = require_token(&self.credentials)?;
        self.coordinator
            .refresh(token, &mut self.snapshot, Utc::now())
            .await
    }

    /// The authenticated user's presence, re-fetched when stale.
    pub async fn own_presence(&mut self) -> AppResult<Presence> {
        self.ensure_fresh().await?;
        let token = require_token(&self.credentials)?;
        self.coordinator
            .refresh_own_presence(token, &mut self.snapshot, Utc::now())
            .await
    }

    /// Set the authenticated user's presence. The cached value only changes
    /// once the service has accepted the update.
    pub async fn set_presence(&mut self, presence: Presence) -> AppResult<()> {
        let token = require_token(&self.credentials)?;
        self.api.set_presence(token, presence).await?;
        tracing::info!("Presence set to {}", presence);

        match self.snapshot.current_user_mut() {
            Some(me) => me.presence = presence,
            None => {
                tracing::debug!("Current user not cached, skipping presence write-back");
                return Ok(());
            }
        }
        self.snapshot.presence_fetched_at = Some(Utc::now());
        self.snapshot.save(&self.config.snapshot_file()).await
    }

    /// Flip between active and away based on the freshest known own presence.
    /// Returns the presence that was set.
    pub async fn toggle_presence(&mut self) -> AppResult<Presence> {
        let presence = self.own_presence().await?.toggled();
        self.set_presence(presence).await?;
        Ok(presence)
    }

    /// Set the authenticated user's status text and emoji. An empty text
    /// clears the status. The cache is only updated after the service accepted
    /// the change.
    pub async fn set_status(&mut self, text: &str, emoji: &str) -> AppResult<()> {
        let token = require_token(&self.credentials)?;
        self.api.set_status(token, text, emoji).await?;
        if text.is_empty() {
            tracing::info!("Status message cleared, emoji set to {:?}", emoji);
        } else {
            tracing::info!("Status set to {:?}", text);
        }

        match self.snapshot.current_user_mut() {
            Some(me) => {
                me.status_text = text.to_string();
                me.status_emoji = emoji.to_string();
            }
            None => {
                tracing::debug!("Current user not cached, skipping status write-back");
                return Ok(());
            }
        }
        self.snapshot.save(&self.config.snapshot_file()).await
    }

    /// Open (or reuse) a direct message channel and return its deep link.
    pub async fn open_direct_message(&self, user_id: &str) -> AppResult<String> {
        let token = require_token(&self.credentials)?;
        let channel_id = self.api.open_direct_message(token, user_id).await?;
        Ok(self.snapshot.identity.channel_link(&channel_id))
    }

    /// Pins are not cached; every call goes to the service.
    pub async fn list_pins(&self, channel_id: &str) -> AppResult<Vec<Pin>> {
        let token = require_token(&self.credentials)?;
        self.api.list_pins(token, channel_id).await
    }

    /// Make sure the custom emoji list has been fetched.
    pub async fn ensure_emoji(&mut self) -> AppResult<()> {
        let token = require_token(&self.credentials)?;
        self.coordinator.ensure_emoji(token, &mut self.snapshot).await
    }

    /// Find the image for an emoji reference such as `:wave:`.
    pub async fn emoji_image(&mut self, reference: &str) -> AppResult<EmojiImage> {
        if let Err(e) = self.ensure_emoji().await {
            tracing::warn!("Unable to load custom emoji: {}", e);
        }
        self.emoji.resolve(&self.snapshot, reference).await
    }

    pub fn emoji_store(&self) -> &EmojiStore {
        &self.emoji
    }

    /// Forget everything: empty snapshot, no persisted cache, no token.
    pub async fn reset(&mut self) -> AppResult<()> {
        self.credentials = Credentials::default();
        self.credentials.save(&self.config.config_file()).await?;

        self.snapshot = Snapshot::default();
        Snapshot::erase(&self.config.snapshot_file()).await?;
        tracing::info!("Workflow has been reset");
        Ok(())
    }
}

fn require_token(credentials: &Credentials) -> AppResult<&str> {
    credentials.token().ok_or(AppError::MissingToken)
}
