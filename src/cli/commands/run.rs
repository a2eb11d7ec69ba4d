//! Polling loop command.

use anyhow::{Context, Result};
use forex_config::AppConfig;
use forex_pipeline::build_pipeline;
use tokio::sync::watch;
use tracing::{error, info};

use crate::cli::RunArgs;

pub async fn run(args: &RunArgs, config: &AppConfig) -> Result<()> {
    info!(
        app = %config.app.name,
        environment = %config.app.environment,
        dry_run = args.dry_run,
        "Starting forex signal pipeline"
    );

    let mut pipeline =
        build_pipeline(config, args.dry_run).context("Failed to build pipeline")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested, finishing current tick"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
        let _ = shutdown_tx.send(true);
    });

    pipeline.run(shutdown_rx).await;
    Ok(())
}
