//! Pose Classification Server - Main Entry Point

use api::{init_logging, run_server, ServerConfig};
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("pose-booth.toml"));
    let config = ServerConfig::load(Some(&config_path))?;
    init_logging(&config)?;

    info!("=== Pose Classification Server v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Training data: {}", config.data_file.display());

    run_server(config).await
}
