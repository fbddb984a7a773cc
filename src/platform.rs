use crate::directory::ChannelInfo;
use crate::error::{http_status, PlatformError};
use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::channel::{Channel, ChannelType};
use serenity::model::id::{ChannelId, GuildId};
use std::sync::Arc;

/// Outbound calls the bot makes against the chat platform.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Channels of `guild_id` in enumeration order, or `None` when the guild
    /// is unknown to the bot.
    async fn guild_channels(&self, guild_id: GuildId)
        -> Result<Option<Vec<ChannelInfo>>, PlatformError>;

    /// Whether messages can be posted to `channel_id`. Unknown channels are not.
    async fn is_text_capable(&self, channel_id: ChannelId) -> Result<bool, PlatformError>;

    async fn say(&self, channel_id: ChannelId, text: &str) -> Result<(), PlatformError>;
}

/// [`Platform`] backed by Discord's REST API.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

/// Guild channel types a bot message can be posted to. Voice and stage
/// channels carry a text chat of their own, so they count.
pub fn accepts_messages(kind: ChannelType) -> bool {
    matches!(
        kind,
        ChannelType::Text
            | ChannelType::News
            | ChannelType::Voice
            | ChannelType::Stage
            | ChannelType::PublicThread
            | ChannelType::PrivateThread
            | ChannelType::NewsThread
    )
}

fn is_missing(error: &serenity::Error) -> bool {
    matches!(http_status(error), Some(403) | Some(404))
}

#[async_trait]
impl Platform for DiscordPlatform {
    async fn guild_channels(
        &self,
        guild_id: GuildId,
    ) -> Result<Option<Vec<ChannelInfo>>, PlatformError> {
        let channels = match guild_id.channels(&self.http).await {
            Ok(channels) => channels,
            Err(e) if is_missing(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // The REST response is unordered; sidebar order keeps first-seen stable.
        let mut channels: Vec<_> = channels.into_values().collect();
        channels.sort_by_key(|channel| (channel.position, channel.id));

        Ok(Some(channels.iter().map(ChannelInfo::from).collect()))
    }

    async fn is_text_capable(&self, channel_id: ChannelId) -> Result<bool, PlatformError> {
        let channel = match channel_id.to_channel(&self.http).await {
            Ok(channel) => channel,
            Err(e) if is_missing(&e) => return Ok(false),
            Err(e) => return Err(e.into()),
        };

        Ok(match channel {
            Channel::Guild(channel) => accepts_messages(channel.kind),
            Channel::Private(_) => true,
            _ => false,
        })
    }

    async fn say(&self, channel_id: ChannelId, text: &str) -> Result<(), PlatformError> {
        channel_id.say(&self.http, text).await?;
        Ok(())
    }
}
