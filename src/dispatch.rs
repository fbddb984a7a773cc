use crate::config::ClientConfiguration;
use crate::directory::{ChannelDirectory, ChannelInfo, ChannelKind};
use crate::error::PlatformError;
use crate::platform::Platform;
use async_trait::async_trait;
use serenity::client::{Context, EventHandler};
use serenity::model::channel::{GuildChannel, Message};
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, UserId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const PING_COMMAND: &str = "!ping";
pub const PING_REPLY: &str = "pong!";

/// Reacts to gateway notifications for one connection.
pub struct Dispatcher<P> {
    platform: P,
    config: ClientConfiguration,
    directory: Arc<ChannelDirectory>,
    bot_id: UserId,
}

impl<P: Platform> Dispatcher<P> {
    pub fn new(
        platform: P,
        config: ClientConfiguration,
        directory: Arc<ChannelDirectory>,
        bot_id: UserId,
    ) -> Self {
        Self {
            platform,
            config,
            directory,
            bot_id,
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn directory(&self) -> &Arc<ChannelDirectory> {
        &self.directory
    }

    pub async fn on_ready(&self) {
        let guild_id = self.config.guild_id;
        let channels = match self.platform.guild_channels(guild_id).await {
            Ok(Some(channels)) => channels,
            Ok(None) => {
                warn!("Configured guild {} was not found", guild_id);
                self.directory.clear().await;
                return;
            }
            Err(e) => {
                error!("Failed to list channels of guild {}: {}", guild_id, e);
                self.directory.clear().await;
                return;
            }
        };

        self.directory.rebuild(&channels).await;
        info!(
            "{} text channels and {} voice channels found on connection",
            self.directory.len(ChannelKind::Text).await,
            self.directory.len(ChannelKind::Voice).await
        );

        if let Some((message, channel_name)) = self.config.announcement() {
            match self.directory.text_channel(channel_name).await {
                Some(channel_id) => {
                    if let Err(e) = self.send_message(channel_id, message).await {
                        error!("Failed to send connection message to #{}: {}", channel_name, e);
                    }
                }
                None => warn!(
                    "Notification channel \"{}\" not found, skipping connection message",
                    channel_name
                ),
            }
        }
    }

    pub async fn on_message(&self, author_id: UserId, channel_id: ChannelId, content: &str) {
        // The bot should never respond to itself.
        if author_id == self.bot_id {
            return;
        }

        if content == PING_COMMAND {
            if let Err(e) = self.platform.say(channel_id, PING_REPLY).await {
                error!("Failed to answer ping in channel {}: {}", channel_id, e);
            }
        }
    }

    pub async fn on_channel_created(&self, channel: &ChannelInfo) {
        if channel.kind == ChannelKind::Other {
            return;
        }
        self.directory.add(channel).await;
    }

    /// `old` is `None` when the gateway had no cached copy of the channel.
    pub async fn on_channel_updated(&self, old: Option<&ChannelInfo>, new: &ChannelInfo) {
        let recovered;
        let old = match old {
            Some(old) => old,
            None => {
                let Some(name) = self.directory.name_of(new.id, new.kind).await else {
                    self.on_channel_created(new).await;
                    return;
                };
                recovered = ChannelInfo::new(new.id, name, new.kind);
                &recovered
            }
        };

        if old.kind == ChannelKind::Other && new.kind == ChannelKind::Other {
            return;
        }
        if old.name == new.name && old.kind == new.kind {
            return;
        }

        debug!("Channel {} renamed from \"{}\" to \"{}\"", new.id, old.name, new.name);
        self.directory.rename(old, new).await;
    }

    pub async fn on_channel_destroyed(&self, channel: &ChannelInfo) {
        if channel.kind == ChannelKind::Other {
            return;
        }
        self.directory.remove(channel).await;
    }

    /// Posts `text` to `channel_id`. Channels that cannot hold messages are
    /// skipped without an error.
    pub async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<(), PlatformError> {
        if !self.platform.is_text_capable(channel_id).await? {
            debug!("Channel {} is not a text channel, message dropped", channel_id);
            return Ok(());
        }
        self.platform.say(channel_id, text).await
    }
}

/// Bridges serenity's gateway events to a [`Dispatcher`].
pub struct Handler<P> {
    dispatcher: Arc<Dispatcher<P>>,
}

impl<P> Handler<P> {
    pub fn new(dispatcher: Arc<Dispatcher<P>>) -> Self {
        Self { dispatcher }
    }

    fn is_tracked(&self, channel: &GuildChannel) -> bool {
        channel.guild_id == self.dispatcher.config.guild_id
    }
}

#[async_trait]
impl<P: Platform + 'static> EventHandler for Handler<P> {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Bot {} is connected", ready.user.name);
        self.dispatcher.on_ready().await;
    }

    async fn message(&self, _ctx: Context, new_message: Message) {
        self.dispatcher
            .on_message(
                new_message.author.id,
                new_message.channel_id,
                &new_message.content,
            )
            .await;
    }

    async fn channel_create(&self, _ctx: Context, channel: GuildChannel) {
        if self.is_tracked(&channel) {
            self.dispatcher
                .on_channel_created(&ChannelInfo::from(&channel))
                .await;
        }
    }

    async fn channel_update(&self, _ctx: Context, old: Option<GuildChannel>, new: GuildChannel) {
        if self.is_tracked(&new) {
            let old = old.as_ref().map(ChannelInfo::from);
            self.dispatcher
                .on_channel_updated(old.as_ref(), &ChannelInfo::from(&new))
                .await;
        }
    }

    async fn channel_delete(
        &self,
        _ctx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        if self.is_tracked(&channel) {
            self.dispatcher
                .on_channel_destroyed(&ChannelInfo::from(&channel))
                .await;
        }
    }
}
