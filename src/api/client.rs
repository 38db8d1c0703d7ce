//! HTTP implementation of [`SlackApi`] on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::wire::{
    AuthTestResponse, ChannelsListResponse, EmojiListResponse, Envelope, ImOpenResponse,
    PinsListResponse, PresenceResponse, SetStatusRequest, StatusProfile, UsersListResponse,
};
use super::SlackApi;
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::models::{Channel, Emoji, Identity, Pin, Presence, User};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Token-authenticated client for the Slack Web API.
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    base_url: String,
}

impl SlackClient {
    /// Create a client for `base_url` (e.g. `https://slack.com/api`). Without a
    /// timeout the transport defaults apply.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("slack-workflow/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(config.api_base_url.clone(), config.http_timeout)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        method: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        tracing::debug!(method, "GET");
        let response = self
            .http
            .get(self.method_url(method))
            .bearer_auth(token)
            .query(params)
            .send()
            .await?;

        let body = read_body(response).await?;
        decode_envelope(method, &body)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        token: &str,
        method: &str,
        body: &B,
    ) -> AppResult<T> {
        let payload = serde_json::to_vec(body)?;
        tracing::debug!(method, bytes = payload.len(), "POST");
        let response = self
            .http
            .post(self.method_url(method))
            .bearer_auth(token)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(payload)
            .send()
            .await?;

        let body = read_body(response).await?;
        decode_envelope(method, &body)
    }
}

/// Drain the response body, then reject statuses outside 2xx/3xx. The body is
/// always consumed so the connection returns to the pool.
async fn read_body(response: Response) -> AppResult<Vec<u8>> {
    let status = response.status();
    let body = response.bytes().await?;

    if !(status.is_success() || status.is_redirection()) {
        tracing::warn!("Request failed with status {}", status);
        return Err(AppError::HttpStatus(status.to_string()));
    }

    Ok(body.to_vec())
}

/// Check the `{ok, error}` envelope, then decode the typed payload.
fn decode_envelope<T: DeserializeOwned>(method: &str, body: &[u8]) -> AppResult<T> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    if !envelope.ok {
        let message = envelope
            .error
            .unwrap_or_else(|| "unknown_error".to_string());
        tracing::warn!(method, "Slack reported an error: {}", message);
        return Err(AppError::RemoteApi {
            method: method.to_string(),
            message,
        });
    }
    if let Some(warning) = envelope.warning {
        tracing::debug!(method, "Slack warning: {}", warning);
    }

    Ok(serde_json::from_slice(body)?)
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn get_identity(&self, token: &str) -> AppResult<Identity> {
        let response: AuthTestResponse = self.get(token, "auth.test", &[]).await?;
        response
            .into_identity()
            .ok_or_else(|| AppError::Decode("auth.test response has no user_id".to_string()))
    }

    async fn list_channels(&self, token: &str) -> AppResult<Vec<Channel>> {
        let response: ChannelsListResponse = self
            .get(token, "channels.list", &[("exclude_archived", "1")])
            .await?;

        Ok(response
            .channels
            .into_iter()
            .filter(|c| !c.is_archived.unwrap_or(false))
            .map(Channel::from)
            .collect())
    }

    async fn list_users(&self, token: &str) -> AppResult<Vec<User>> {
        let response: UsersListResponse = self.get(token, "users.list", &[]).await?;
        Ok(response.members.into_iter().map(User::from).collect())
    }

    async fn list_emoji(&self, token: &str) -> AppResult<Vec<Emoji>> {
        let response: EmojiListResponse = self.get(token, "emoji.list", &[]).await?;
        Ok(response.into_emoji())
    }

    async fn get_presence(&self, token: &str, user_id: &str) -> AppResult<Presence> {
        let response: PresenceResponse = self
            .get(token, "users.getPresence", &[("user", user_id)])
            .await?;

        Ok(response
            .presence
            .as_deref()
            .map(Presence::from_remote)
            .unwrap_or_default())
    }

    async fn set_presence(&self, token: &str, presence: Presence) -> AppResult<()> {
        let _: Envelope = self
            .get(token, "users.setPresence", &[("presence", presence.as_setting())])
            .await?;
        Ok(())
    }

    async fn set_status(&self, token: &str, text: &str, emoji: &str) -> AppResult<()> {
        let request = SetStatusRequest {
            profile: StatusProfile {
                status_text: text,
                status_emoji: emoji,
            },
        };
        let _: Envelope = self.post_json(token, "users.profile.set", &request).await?;
        Ok(())
    }

    async fn list_pins(&self, token: &str, channel_id: &str) -> AppResult<Vec<Pin>> {
        let response: PinsListResponse = self
            .get(token, "pins.list", &[("channel", channel_id)])
            .await?;

        Ok(response
            .items
            .into_iter()
            .map(|item| item.into_pin(channel_id))
            .collect())
    }

    async fn open_direct_message(&self, token: &str, user_id: &str) -> AppResult<String> {
        let response: ImOpenResponse = self.get(token, "im.open", &[("user", user_id)]).await?;
        response
            .channel
            .map(|c| c.id)
            .ok_or_else(|| AppError::Decode("im.open response has no channel".to_string()))
    }

    async fn fetch_binary(&self, url: &str) -> AppResult<Vec<u8>> {
        tracing::debug!(url, "Fetching binary content");
        let response = self.http.get(url).send().await?;
        read_body(response).await
    }
}
