use crate::config::ClientConfiguration;
use crate::directory::ChannelDirectory;
use crate::dispatch::{Dispatcher, Handler};
use crate::error::{http_status, ClientError};
use crate::platform::DiscordPlatform;
use serenity::gateway::ShardManager;
use serenity::http::Http;
use serenity::model::gateway::GatewayIntents;
use serenity::model::id::ChannelId;
use serenity::Client;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Gateway events the client subscribes to.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

struct Connection {
    dispatcher: Arc<Dispatcher<DiscordPlatform>>,
    shard_manager: Arc<ShardManager>,
    task: JoinHandle<Result<(), serenity::Error>>,
    closed: watch::Receiver<bool>,
}

/// Runs `gateway` on the runtime and flips the returned flag once it ends.
fn spawn_gateway<F, T>(gateway: F) -> (JoinHandle<T>, watch::Receiver<bool>)
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let (closed_tx, closed_rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let result = gateway.await;
        let _ = closed_tx.send(true);
        result
    });
    (task, closed_rx)
}

/// Owns the connection to Discord for one process.
///
/// Construct it, call [`BotClient::start`], and always finish with
/// [`BotClient::stop`], including when `start` failed.
pub struct BotClient {
    directory: Arc<ChannelDirectory>,
    connection: Mutex<Option<Connection>>,
}

impl Default for BotClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BotClient {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(ChannelDirectory::new()),
            connection: Mutex::new(None),
        }
    }

    pub async fn is_started(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Channel name lookups for the configured guild.
    pub fn directory(&self) -> &Arc<ChannelDirectory> {
        &self.directory
    }

    /// Logs in with `token` and starts the gateway connection in the background.
    ///
    /// Does nothing when the client is already started. Only token problems
    /// fail with [`ClientError::Authentication`]; everything that happens
    /// after the connection is up is handled and logged by the event handlers.
    pub async fn start(&self, token: &str, config: ClientConfiguration) -> Result<(), ClientError> {
        let mut connection = self.connection.lock().await;
        if connection.is_some() {
            return Ok(());
        }

        serenity::utils::validate_token(token)
            .map_err(|e| ClientError::Authentication(e.to_string()))?;

        let http = Arc::new(Http::new(token));
        let bot = match http.get_current_user().await {
            Ok(user) => user,
            Err(e) if matches!(http_status(&e), Some(401) | Some(403)) => {
                return Err(ClientError::Authentication(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        info!("Logged in as {} ({})", bot.name, bot.id);

        self.directory.clear().await;
        let dispatcher = Arc::new(Dispatcher::new(
            DiscordPlatform::new(http.clone()),
            config,
            self.directory.clone(),
            bot.id,
        ));

        let mut client = Client::builder(token, intents())
            .event_handler(Handler::new(dispatcher.clone()))
            .await?;
        let shard_manager = client.shard_manager.clone();

        info!("Starting gateway connection...");
        let (task, closed) = spawn_gateway(async move { client.start().await });

        *connection = Some(Connection {
            dispatcher,
            shard_manager,
            task,
            closed,
        });
        Ok(())
    }

    /// Disconnects every shard and waits for the gateway task to finish.
    /// Does nothing when the client is not started.
    pub async fn stop(&self) {
        let Some(connection) = self.connection.lock().await.take() else {
            return;
        };

        info!("Stopping gateway connection...");
        connection.shard_manager.shutdown_all().await;
        match connection.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Gateway connection ended with an error: {}", e),
            Err(e) => error!("Gateway task failed: {}", e),
        }
        self.directory.clear().await;
        info!("Disconnected");
    }

    /// Resolves once the gateway task exits on its own, e.g. after the token
    /// is revoked. Returns immediately when the client is not started.
    pub async fn wait_closed(&self) {
        let mut closed = match self.connection.lock().await.as_ref() {
            Some(connection) => connection.closed.clone(),
            None => return,
        };
        // A dropped sender means the task is gone as well.
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Posts `text` to `channel_id`. Channels that cannot hold messages and
    /// calls made while the client is stopped are skipped without an error.
    pub async fn send_message(&self, channel_id: ChannelId, text: &str) -> Result<(), ClientError> {
        let dispatcher = match self.connection.lock().await.as_ref() {
            Some(connection) => connection.dispatcher.clone(),
            None => {
                warn!("Client is not started, message to {} dropped", channel_id);
                return Ok(());
            }
        };
        dispatcher.send_message(channel_id, text).await?;
        Ok(())
    }
}
