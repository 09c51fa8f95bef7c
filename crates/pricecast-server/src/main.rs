//! pricecast - real-time crypto price streaming service.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Real-time crypto price streaming service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PRICECAST_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    pricecast_telemetry::init_logging()?;

    info!("Starting pricecast v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > PRICECAST_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PRICECAST_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = pricecast_server::AppConfig::load(&config_path)?;
    info!(
        pair = %config.pair,
        port = config.server.port,
        history_backend = ?config.history.backend,
        "Configuration loaded"
    );

    let app = pricecast_server::Application::new(config)?;
    app.run().await?;

    Ok(())
}
