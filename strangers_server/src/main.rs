//! Binary entry point for the signaling server

use clap::Parser;
use strangers_server::{ServerConfig, SignalingError, run};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), SignalingError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    run(config).await
}
