//! Configuration structures.

use forex_core::types::Timeframe;
use forex_indicators::IndicatorParams;
use forex_signals::{AlertConfig, RsiBands, ThresholdRule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub indicators: IndicatorSettings,
    #[serde(default)]
    pub alerts: AlertSettings,
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub news: NewsSettings,
    #[serde(default)]
    pub postgres: PostgresSettings,
    #[serde(default)]
    pub sheet: SheetSettings,
    #[serde(default)]
    pub telegram: TelegramSettings,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "forex-signal".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Daily-rolling log file, e.g. `logs/forex.log`
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Where bars come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[default]
    TwelveData,
    Csv,
}

/// Polling loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub instruments: Vec<String>,
    pub poll_interval_secs: u64,
    pub warmup_bars: usize,
    pub fetch_timeout_secs: u64,
    pub sink_timeout_secs: u64,
    /// Attempts per fetch and per sink call, first call included
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub source: SourceKind,
    pub csv_dir: Option<String>,
    /// Walk CSV files one row per tick instead of re-reading the tail
    pub csv_replay: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            instruments: vec!["EUR/USD".into(), "GBP/USD".into(), "USD/JPY".into()],
            poll_interval_secs: 900,
            warmup_bars: 60,
            fetch_timeout_secs: 10,
            sink_timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 500,
            source: SourceKind::TwelveData,
            csv_dir: None,
            csv_replay: false,
        }
    }
}

impl PipelineSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_secs(self.sink_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

/// Indicator periods and band levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub levels_lookback: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        let params = IndicatorParams::default();
        let bands = RsiBands::default();
        Self {
            ema_fast: params.ema_fast,
            ema_slow: params.ema_slow,
            rsi_period: params.rsi_period,
            atr_period: params.atr_period,
            levels_lookback: AlertConfig::default().levels_lookback,
            rsi_overbought: bands.overbought,
            rsi_oversold: bands.oversold,
        }
    }
}

/// Absolute price alerts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AlertSettings {
    pub thresholds: Vec<ThresholdRule>,
}

/// Market-data provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub interval: Timeframe,
    pub requests_per_minute: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.twelvedata.com".to_string(),
            api_key: None,
            interval: Timeframe::Minute15,
            requests_per_minute: 8,
        }
    }
}

/// News context settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsSettings {
    /// Used when no calendar endpoint is configured
    pub static_headline: Option<String>,
    /// JSON calendar endpoint; enables the HTTP news adapter
    pub calendar_url: Option<String>,
    /// JSON rating endpoint queried per instrument
    pub sentiment_url: Option<String>,
    /// Fixed labels per instrument, e.g. `"EUR/USD" = "Strong Buy"`
    pub sentiment: HashMap<String, String>,
    /// Replace headlines with a weekend notice on Saturday and Sunday
    pub weekend_notice: bool,
}

impl Default for NewsSettings {
    fn default() -> Self {
        Self {
            static_headline: None,
            calendar_url: None,
            sentiment_url: None,
            sentiment: HashMap::new(),
            weekend_notice: true,
        }
    }
}

/// Relational sink; disabled without a URL.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PostgresSettings {
    pub url: Option<String>,
}

/// Spreadsheet sink; disabled without a path.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SheetSettings {
    pub path: Option<String>,
}

/// Notification sink; disabled unless both token and chat are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub base_url: String,
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            base_url: "https://api.telegram.org".to_string(),
        }
    }
}

impl TelegramSettings {
    /// Token and chat when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.bot_token.as_deref()?, self.chat_id.as_deref()?))
    }
}

impl AppConfig {
    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            ema_fast: self.indicators.ema_fast,
            ema_slow: self.indicators.ema_slow,
            rsi_period: self.indicators.rsi_period,
            atr_period: self.indicators.atr_period,
        }
    }

    pub fn alert_config(&self) -> AlertConfig {
        AlertConfig {
            thresholds: self.alerts.thresholds.clone(),
            rsi_bands: RsiBands {
                overbought: self.indicators.rsi_overbought,
                oversold: self.indicators.rsi_oversold,
            },
            levels_lookback: self.indicators.levels_lookback,
        }
    }
}
