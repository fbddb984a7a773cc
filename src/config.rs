use dotenvy::dotenv;
use serde::Deserialize;
use serenity::model::id::GuildId;
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_CONFIG_FILE: &str = "lorlina.toml";

/// What the client does once it is connected. Fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfiguration {
    /// The only guild whose channels are tracked.
    pub guild_id: GuildId,
    /// Posted once the channel directory has been built.
    pub connected_message: Option<String>,
    /// Name of the text channel the connection message goes to.
    pub notification_channel: Option<String>,
}

impl ClientConfiguration {
    pub fn new(guild_id: impl Into<GuildId>) -> Self {
        Self {
            guild_id: guild_id.into(),
            connected_message: None,
            notification_channel: None,
        }
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let file: FileConfig = toml::from_str(content)?;
        let guild_id = file
            .guild_id
            .filter(|id| *id != 0)
            .ok_or_else(|| anyhow::anyhow!("guild_id must be a non-zero u64"))?;
        Ok(Self {
            guild_id: GuildId::new(guild_id),
            connected_message: file.connected_message,
            notification_channel: file.notification_channel,
        })
    }

    /// Message and channel name, only when both are configured.
    pub fn announcement(&self) -> Option<(&str, &str)> {
        Some((
            self.connected_message.as_deref()?,
            self.notification_channel.as_deref()?,
        ))
    }
}

#[derive(Clone)]
pub struct Config {
    pub discord_token: String,
    pub client: ClientConfiguration,
}

/// Fields of the optional config file; every one may also come from the environment.
#[derive(Default, Deserialize)]
struct FileConfig {
    guild_id: Option<u64>,
    connected_message: Option<String>,
    notification_channel: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();
        Self::build()
    }

    fn build() -> anyhow::Result<Self> {
        let file = Self::load_file()?;

        let guild_id = match non_empty_var("DISCORD_GUILD_ID") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("DISCORD_GUILD_ID must be a valid u64"))?,
            None => file
                .guild_id
                .ok_or_else(|| anyhow::anyhow!("DISCORD_GUILD_ID must be set"))?,
        };
        if guild_id == 0 {
            anyhow::bail!("DISCORD_GUILD_ID must not be zero");
        }

        Ok(Config {
            discord_token: non_empty_var("DISCORD_TOKEN")
                .ok_or_else(|| anyhow::anyhow!("DISCORD_TOKEN must be set"))?,
            client: ClientConfiguration {
                guild_id: GuildId::new(guild_id),
                connected_message: non_empty_var("CONNECTED_MESSAGE")
                    .or(file.connected_message),
                notification_channel: non_empty_var("NOTIFICATION_CHANNEL")
                    .or(file.notification_channel),
            },
        })
    }

    fn config_path() -> PathBuf {
        non_empty_var("LORLINA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    fn load_file() -> anyhow::Result<FileConfig> {
        let path = Self::config_path();
        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("invalid config file {}: {}", path.display(), e)),
            Err(_) => Ok(FileConfig::default()),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("discord_token", &"[REDACTED]")
            .field("client", &self.client)
            .finish()
    }
}
