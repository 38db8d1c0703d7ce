//! Request and response bodies of the Slack Web API.
//!
//! Every field the service may omit is an `Option`, so "absent" stays distinct
//! from "empty" until the conversion into the domain models below.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Channel, Emoji, Identity, Pin, PinnedFile, PinnedMessage, Presence, User};

/// Common `{ok, error}` head of every response.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub ok: bool,
    pub error: Option<String>,
    pub warning: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AuthTestResponse {
    pub user_id: Option<String>,
    pub team_id: Option<String>,
    pub team: Option<String>,
    pub user: Option<String>,
    pub url: Option<String>,
}

impl AuthTestResponse {
    /// `None` when the service did not report a user id.
    pub fn into_identity(self) -> Option<Identity> {
        let user_id = self.user_id.filter(|id| !id.is_empty())?;
        Some(Identity {
            user_id,
            team_id: self.team_id.unwrap_or_default(),
            team_name: self.team.unwrap_or_default(),
            user_name: self.user.unwrap_or_default(),
            url: self.url.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextValue {
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelDto {
    pub id: String,
    pub name: Option<String>,
    pub members: Option<Vec<String>>,
    pub topic: Option<TextValue>,
    pub purpose: Option<TextValue>,
    pub is_archived: Option<bool>,
}

impl From<ChannelDto> for Channel {
    fn from(dto: ChannelDto) -> Self {
        Channel {
            id: dto.id,
            name: dto.name.unwrap_or_default(),
            member_ids: dto.members.unwrap_or_default(),
            topic: dto.topic.and_then(|t| t.value).unwrap_or_default(),
            purpose: dto.purpose.and_then(|p| p.value).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelsListResponse {
    #[serde(default)]
    pub channels: Vec<ChannelDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileDto {
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub status_text: Option<String>,
    pub status_emoji: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserDto {
    pub id: String,
    pub name: Option<String>,
    pub deleted: Option<bool>,
    pub presence: Option<String>,
    pub profile: Option<ProfileDto>,
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        let profile = dto.profile.unwrap_or(ProfileDto {
            real_name: None,
            email: None,
            status_text: None,
            status_emoji: None,
        });
        User {
            id: dto.id,
            name: dto.name.unwrap_or_default(),
            real_name: profile.real_name.unwrap_or_default(),
            email: profile.email.filter(|e| !e.is_empty()),
            deleted: dto.deleted.unwrap_or(false),
            presence: dto
                .presence
                .as_deref()
                .map(Presence::from_remote)
                .unwrap_or_default(),
            status_text: profile.status_text.unwrap_or_default(),
            status_emoji: profile.status_emoji.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersListResponse {
    #[serde(default)]
    pub members: Vec<UserDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EmojiListResponse {
    #[serde(default)]
    pub emoji: BTreeMap<String, String>,
}

impl EmojiListResponse {
    /// Sorted by name. `alias:<target>` entries take the target's URL; aliases
    /// of built-in emoji have no image of their own and are dropped.
    pub fn into_emoji(self) -> Vec<Emoji> {
        self.emoji
            .iter()
            .filter_map(|(name, url)| {
                let url = match url.strip_prefix("alias:") {
                    Some(target) => match self.emoji.get(target) {
                        Some(target_url) if !target_url.starts_with("alias:") => target_url,
                        _ => {
                            tracing::debug!("Dropping unresolved emoji alias {} -> {}", name, target);
                            return None;
                        }
                    },
                    None => url,
                };
                Some(Emoji {
                    name: name.clone(),
                    url: url.clone(),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PresenceResponse {
    pub presence: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PinnedMessageDto {
    pub ts: Option<String>,
    pub user: Option<String>,
    pub text: Option<String>,
    pub permalink: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PinnedFileDto {
    pub title: Option<String>,
    pub filetype: Option<String>,
    pub mimetype: Option<String>,
    pub pretty_type: Option<String>,
    pub permalink: Option<String>,
    pub url_private: Option<String>,
    pub thumb_64: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PinDto {
    pub channel: Option<String>,
    pub created: Option<i64>,
    pub message: Option<PinnedMessageDto>,
    pub file: Option<PinnedFileDto>,
}

impl PinDto {
    pub fn into_pin(self, channel_id: &str) -> Pin {
        Pin {
            channel: self.channel.unwrap_or_else(|| channel_id.to_string()),
            created: self.created.unwrap_or_default(),
            message: self.message.map(|m| PinnedMessage {
                ts: m.ts.unwrap_or_default(),
                user: m.user,
                text: m.text.unwrap_or_default(),
                permalink: m.permalink,
            }),
            file: self.file.map(|f| PinnedFile {
                title: f.title.unwrap_or_default(),
                file_type: f.filetype,
                mime_type: f.mimetype,
                pretty_type: f.pretty_type,
                permalink: f.permalink,
                private_url: f.url_private,
                thumb_64: f.thumb_64,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PinsListResponse {
    #[serde(default)]
    pub items: Vec<PinDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImOpenResponse {
    pub channel: Option<ChannelRef>,
}

/// Body of `users.profile.set`.
#[derive(Debug, Serialize)]
pub(crate) struct SetStatusRequest<'a> {
    pub profile: StatusProfile<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusProfile<'a> {
    pub status_text: &'a str,
    pub status_emoji: &'a str,
}
