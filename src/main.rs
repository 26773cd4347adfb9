mod bot;
mod config;
mod content;
mod server;
mod telegram;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::bot::Bot;
use crate::config::Config;
use crate::transport::{ReqwestTransport, Transport};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,factbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let endpoints = config.endpoints().context("Invalid configuration")?;

    info!("Configuration loaded successfully");
    info!("  Fact provider: {}", endpoints.fact);
    info!("  Joke provider: {}", endpoints.joke);
    info!("  Telegram API: {}", config.telegram.api_base_url);

    let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new());
    let bot = Arc::new(Bot::from_endpoints(transport, &endpoints));

    let listener = TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.listen_addr))?;

    info!("Webhook handler listening on {}", listener.local_addr()?);
    server::serve(listener, bot).await?;

    Ok(())
}
