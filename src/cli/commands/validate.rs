//! Validate configuration command.

use anyhow::Result;
use forex_config::load_validated;
use std::path::Path;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match load_validated(config_path) {
        Ok(config) => {
            let enabled = |on: bool| if on { "enabled" } else { "disabled" };
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!("Instruments: {}", config.pipeline.instruments.join(", "));
            println!("Poll interval: {}s", config.pipeline.poll_interval_secs);
            println!("Source: {:?}", config.pipeline.source);
            println!(
                "EMA fast/slow: {}/{}",
                config.indicators.ema_fast, config.indicators.ema_slow
            );
            println!("Price thresholds: {}", config.alerts.thresholds.len());
            println!("PostgreSQL sink: {}", enabled(config.postgres.url.is_some()));
            println!("Sheet sink: {}", enabled(config.sheet.path.is_some()));
            println!(
                "Telegram sink: {}",
                enabled(config.telegram.credentials().is_some())
            );
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
