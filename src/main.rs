//! Forex signal pipeline CLI.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use forex_config::{load_validated, AppConfig};
use forex_monitor::{setup_logging, LogOptions, WorkerGuard};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::ValidateConfig => {
            let _guard = init_logging(&cli, None)?;
            cli::commands::validate::run(&cli.config).await
        }
        Commands::Run(ref args) => {
            let config = load(&cli)?;
            let _guard = init_logging(&cli, Some(&config))?;
            cli::commands::run::run(args, &config).await
        }
        Commands::Once(ref args) => {
            let config = load(&cli)?;
            let _guard = init_logging(&cli, Some(&config))?;
            cli::commands::once::run(args, &config).await
        }
    }
}

fn load(cli: &Cli) -> Result<AppConfig> {
    load_validated(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))
}

/// Command-line flags win over the configuration file.
fn init_logging(cli: &Cli, config: Option<&AppConfig>) -> Result<Option<WorkerGuard>> {
    let logging = config.map(|c| &c.logging);
    let options = LogOptions {
        level: cli
            .log_level
            .map(|l| l.as_str().to_string())
            .or_else(|| logging.map(|l| l.level.clone()))
            .unwrap_or_else(|| "info".to_string()),
        json: cli.json_logs || logging.is_some_and(|l| l.format == "json"),
        file: logging.and_then(|l| l.file.as_ref().map(PathBuf::from)),
    };
    setup_logging(&options).context("Failed to initialise logging")
}
