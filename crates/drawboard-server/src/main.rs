//! Drawboard server: realtime hub plus auth API.
//!
//! Reads its configuration from the environment (after loading an
//! optional `.env`), then serves until terminated.

mod config;

use drawboard::DrawboardServerBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
    })?;
    tracing::info!(
        http = %config.http_addr,
        realtime = %config.realtime_addr,
        "starting drawboard server"
    );

    let server = DrawboardServerBuilder::from_config(config)
        .build()
        .await
        .inspect_err(|e| tracing::error!(error = %e, "startup failed"))?;
    server.run().await?;
    Ok(())
}
