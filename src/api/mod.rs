//! Slack Web API client.
//!
//! [`SlackApi`] is the seam the refresh coordinator and session talk to;
//! [`SlackClient`] is the HTTP implementation.

mod client;
mod wire;

pub use client::*;

use async_trait::async_trait;

use crate::errors::AppResult;
use crate::models::{Channel, Emoji, Identity, Pin, Presence, User};

/// One operation per remote resource. Every call takes the API token.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// `auth.test`: validate the token and return the authenticated identity.
    async fn get_identity(&self, token: &str) -> AppResult<Identity>;

    /// `channels.list`, excluding archived channels.
    async fn list_channels(&self, token: &str) -> AppResult<Vec<Channel>>;

    /// `users.list`.
    async fn list_users(&self, token: &str) -> AppResult<Vec<User>>;

    /// `emoji.list`, sorted by name with aliases resolved.
    async fn list_emoji(&self, token: &str) -> AppResult<Vec<Emoji>>;

    /// `users.getPresence` for a single user.
    async fn get_presence(&self, token: &str, user_id: &str) -> AppResult<Presence>;

    /// `users.setPresence` for the authenticated user.
    async fn set_presence(&self, token: &str, presence: Presence) -> AppResult<()>;

    /// `users.profile.set` with the status text and emoji reference.
    async fn set_status(&self, token: &str, text: &str, emoji: &str) -> AppResult<()>;

    /// `pins.list` for a channel.
    async fn list_pins(&self, token: &str, channel_id: &str) -> AppResult<Vec<Pin>>;

    /// `im.open`: returns the direct message channel id.
    async fn open_direct_message(&self, token: &str, user_id: &str) -> AppResult<String>;

    /// Unauthenticated GET of arbitrary content, e.g. an emoji image.
    async fn fetch_binary(&self, url: &str) -> AppResult<Vec<u8>>;
}
