//! Exoplanet Prediction API - Main Entry Point

use api::{init_logging, run_server, ApiConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load()?;
    init_logging(&config)?;

    info!("=== Exoplanet Prediction API v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Model artifact: {}", config.model_path.display());

    run_server(config).await?;

    Ok(())
}
