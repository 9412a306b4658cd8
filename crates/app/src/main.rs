//! Kiddo - family event pipeline
//!
//! Main entry point: runs the pipeline until Ctrl-C.

use anyhow::Context;
use kiddo_app::AppContext;
use kiddo_common::observability::{init_logging, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any KIDDO_* overrides
    let dotenv = dotenvy::dotenv();

    let config = kiddo_infra::config::load().context("failed to load configuration")?;
    let format: LogFormat = config.logging.format.parse()?;
    init_logging(&config.logging.level, format)?;

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "Loaded .env"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    let context = AppContext::new(config).context("failed to build pipeline")?;
    let metrics = context
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await?;

    tracing::info!(
        processed = metrics.processed,
        dead_lettered = metrics.dead_lettered,
        "Kiddo stopped"
    );
    Ok(())
}
