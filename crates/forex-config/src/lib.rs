//! Configuration management.

mod settings;

pub use settings::{
    AlertSettings, AppConfig, AppSettings, IndicatorSettings, LoggingConfig, NewsSettings,
    PipelineSettings, PostgresSettings, ProviderSettings, SheetSettings, SourceKind,
    TelegramSettings,
};

use config::{Config, Environment, File};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Configuration errors. Any of them aborts startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from file and environment.
///
/// Environment variables use the `FOREX` prefix and `__` as the section
/// separator, e.g. `FOREX__PROVIDER__API_KEY`. The plain provider and bot
/// variables (`TWELVE_DATA_API_KEY`, `TELEGRAM_BOT_TOKEN`,
/// `TELEGRAM_CHAT_ID`) fill in credentials left unset.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("FOREX")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("pipeline.instruments")
                .try_parsing(true),
        )
        .build()?;

    let mut app: AppConfig = config.try_deserialize()?;
    fill_credentials_from_env(&mut app);
    Ok(app)
}

/// Load and validate in one step.
pub fn load_validated(path: &Path) -> Result<AppConfig, ConfigError> {
    let app = load_config(path)?;
    app.validate()?;
    Ok(app)
}

fn fill_credentials_from_env(app: &mut AppConfig) {
    let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
    if app.provider.api_key.is_none() {
        app.provider.api_key = env("TWELVE_DATA_API_KEY");
    }
    if app.telegram.bot_token.is_none() {
        app.telegram.bot_token = env("TELEGRAM_BOT_TOKEN");
    }
    if app.telegram.chat_id.is_none() {
        app.telegram.chat_id = env("TELEGRAM_CHAT_ID");
    }
}

impl AppConfig {
    /// Check every setting the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));
        let pipeline = &self.pipeline;

        if pipeline.instruments.is_empty() {
            return invalid("pipeline.instruments must not be empty".into());
        }
        let mut seen = HashSet::new();
        for instrument in &pipeline.instruments {
            if instrument.trim().is_empty() {
                return invalid("pipeline.instruments contains an empty name".into());
            }
            if !seen.insert(instrument.as_str()) {
                return invalid(format!("duplicate instrument {}", instrument));
            }
        }
        if pipeline.poll_interval_secs == 0 {
            return invalid("pipeline.poll_interval_secs must be greater than 0".into());
        }
        if pipeline.fetch_timeout_secs == 0 || pipeline.sink_timeout_secs == 0 {
            return invalid("pipeline timeouts must be greater than 0".into());
        }
        if pipeline.max_attempts == 0 {
            return invalid("pipeline.max_attempts must be at least 1".into());
        }

        self.indicator_params()
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("indicators: {}", e)))?;
        self.alert_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        match pipeline.source {
            SourceKind::TwelveData => {
                let has_key = self
                    .provider
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.trim().is_empty());
                if !has_key {
                    return invalid(
                        "provider.api_key is required for the twelve_data source".into(),
                    );
                }
                if self.provider.requests_per_minute == 0 {
                    return invalid("provider.requests_per_minute must be greater than 0".into());
                }
            }
            SourceKind::Csv => {
                if pipeline.csv_dir.is_none() {
                    return invalid("pipeline.csv_dir is required for the csv source".into());
                }
            }
        }

        if self.news.sentiment_url.is_some() && self.news.calendar_url.is_none() {
            return invalid("news.sentiment_url requires news.calendar_url".into());
        }

        if self.telegram.bot_token.is_some() != self.telegram.chat_id.is_some() {
            return invalid("telegram.bot_token and telegram.chat_id must be set together".into());
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return invalid(format!(
                "logging.format must be pretty or json, got {}",
                self.logging.format
            ));
        }

        Ok(())
    }
}
