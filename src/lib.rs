pub mod client;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod platform;

pub use client::BotClient;
pub use config::{ClientConfiguration, Config};
pub use directory::{ChannelDirectory, ChannelInfo, ChannelKind};
pub use error::ClientError;
