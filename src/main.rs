use lorlina::{config::Config, BotClient};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);

    let client = BotClient::new();
    let result = run(&client, config).await;

    // Runs on every exit path, including a failed start.
    client.stop().await;

    if let Err(e) = &result {
        error!("Client error: {}", e);
    }
    result
}

async fn run(client: &BotClient, config: Config) -> anyhow::Result<()> {
    client.start(&config.discord_token, config.client).await?;

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received");
        }
        _ = client.wait_closed() => {
            info!("Gateway connection closed");
        }
    }

    Ok(())
}
