//! Twelve Data `time_series` adapter.

use crate::rate_limit::RateLimiter;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use forex_core::error::DataError;
use forex_core::traits::DataSource;
use forex_core::types::{Bar, Timeframe};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Public Twelve Data REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";

/// Seconds to back off when the provider reports an exhausted quota.
const QUOTA_RETRY_SECS: u64 = 60;

/// Twelve Data API configuration.
#[derive(Debug, Clone)]
pub struct TwelveDataConfig {
    pub base_url: String,
    pub api_key: String,
    pub interval: Timeframe,
    pub timeout: Duration,
}

impl TwelveDataConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            interval: Timeframe::Minute15,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(default)]
    values: Option<Vec<TimeSeriesValue>>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
}

/// Prices arrive as decimal strings.
#[derive(Debug, Deserialize)]
struct TimeSeriesValue {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
}

/// Bars from the Twelve Data REST API.
pub struct TwelveDataSource {
    config: TwelveDataConfig,
    client: Client,
    limiter: Option<Arc<RateLimiter>>,
}

impl TwelveDataSource {
    pub fn new(config: TwelveDataConfig) -> Result<Self, DataError> {
        if config.api_key.trim().is_empty() {
            return Err(DataError::Internal("Twelve Data API key is empty".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;
        Ok(Self {
            config,
            client,
            limiter: None,
        })
    }

    /// Share a request budget with other callers.
    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    fn status_error(status: StatusCode, body: String) -> DataError {
        if status == StatusCode::TOO_MANY_REQUESTS {
            DataError::RateLimited {
                retry_after_secs: QUOTA_RETRY_SECS,
            }
        } else if status.is_server_error() {
            DataError::Provider(format!("{}: {}", status, body))
        } else {
            DataError::Internal(format!("{}: {}", status, body))
        }
    }

    /// Map an in-body error (`"status": "error"`) onto a data error.
    fn body_error(instrument: &str, code: Option<u16>, message: String) -> DataError {
        match code {
            Some(429) => DataError::RateLimited {
                retry_after_secs: QUOTA_RETRY_SECS,
            },
            Some(400) | Some(404) if message.to_lowercase().contains("symbol") => {
                DataError::SymbolNotFound(instrument.to_string())
            }
            Some(401) | Some(403) => DataError::Internal(message),
            _ => DataError::Provider(message),
        }
    }

    fn parse_datetime(text: &str) -> Result<i64, DataError> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            return Ok(dt.and_utc().timestamp_millis());
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp_millis())
            .ok_or_else(|| DataError::ParseError(format!("Could not parse datetime: {}", text)))
    }

    fn parse_price(field: &str, text: &str) -> Result<f64, DataError> {
        text.trim()
            .parse::<f64>()
            .map_err(|_| DataError::ParseError(format!("Invalid {}: {}", field, text)))
    }

    fn to_bar(instrument: &str, value: &TimeSeriesValue) -> Result<Bar, DataError> {
        Ok(Bar::new(
            instrument,
            Self::parse_datetime(&value.datetime)?,
            Self::parse_price("open", &value.open)?,
            Self::parse_price("high", &value.high)?,
            Self::parse_price("low", &value.low)?,
            Self::parse_price("close", &value.close)?,
        ))
    }
}

#[async_trait]
impl DataSource for TwelveDataSource {
    async fn recent_bars(&self, instrument: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let url = format!("{}/time_series", self.config.base_url.trim_end_matches('/'));
        let params = [
            ("symbol", instrument.to_string()),
            ("interval", self.config.interval.as_provider_str().to_string()),
            ("outputsize", count.max(1).to_string()),
            ("timezone", "UTC".to_string()),
            ("apikey", self.config.api_key.clone()),
        ];

        let resp = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DataError::Timeout(self.config.timeout)
                } else {
                    DataError::ConnectionError(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::status_error(status, text));
        }

        let data: TimeSeriesResponse = resp
            .json()
            .await
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        if data.status.as_deref() == Some("error") {
            let message = data.message.unwrap_or_else(|| "unknown error".into());
            warn!(instrument, code = ?data.code, %message, "Twelve Data returned an error");
            return Err(Self::body_error(instrument, data.code, message));
        }

        let values = data
            .values
            .ok_or_else(|| DataError::NoDataAvailable(instrument.to_string()))?;

        let mut bars = values
            .iter()
            .map(|v| Self::to_bar(instrument, v))
            .collect::<Result<Vec<_>, _>>()?;

        // Newest first on the wire
        bars.sort_by_key(|b| b.timestamp);
        debug!(instrument, bars = bars.len(), "Fetched bars");

        if bars.is_empty() {
            return Err(DataError::NoDataAvailable(instrument.to_string()));
        }
        Ok(bars)
    }

    fn name(&self) -> &str {
        "twelve-data"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> TwelveDataSource {
        let config = TwelveDataConfig {
            base_url: server.uri(),
            ..TwelveDataConfig::new("test-key")
        };
        TwelveDataSource::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_parses_time_series_oldest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_series"))
            .and(query_param("symbol", "EUR/USD"))
            .and(query_param("interval", "15min"))
            .and(query_param("outputsize", "2"))
            .and(query_param("apikey", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "meta": {"symbol": "EUR/USD", "interval": "15min"},
                "values": [
                    {"datetime": "2024-01-15 10:45:00", "open": "1.0950", "high": "1.0960",
                     "low": "1.0945", "close": "1.0958"},
                    {"datetime": "2024-01-15 10:30:00", "open": "1.0940", "high": "1.0952",
                     "low": "1.0938", "close": "1.0950"}
                ],
                "status": "ok"
            })))
            .mount(&server)
            .await;

        let bars = source(&server).recent_bars("EUR/USD", 2).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert_eq!(bars[1].close, 1.0958);
        assert_eq!(bars[0].instrument, "EUR/USD");
        assert_eq!(bars[1].timestamp - bars[0].timestamp, 15 * 60 * 1000);
    }

    #[tokio::test]
    async fn test_latest_bar_is_newest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [
                    {"datetime": "2024-01-15", "open": "148.1", "high": "148.9",
                     "low": "147.8", "close": "148.5"}
                ],
                "status": "ok"
            })))
            .mount(&server)
            .await;

        let bar = source(&server).latest_bar("USD/JPY").await.unwrap();
        assert_eq!(bar.close, 148.5);
    }

    #[tokio::test]
    async fn test_quota_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 429,
                "message": "You have run out of API credits for the current minute.",
                "status": "error"
            })))
            .mount(&server)
            .await;

        let err = source(&server).recent_bars("EUR/USD", 5).await.unwrap_err();
        assert!(matches!(err, DataError::RateLimited { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 400,
                "message": "**symbol** not found: XXX/YYY",
                "status": "error"
            })))
            .mount(&server)
            .await;

        let err = source(&server).recent_bars("XXX/YYY", 5).await.unwrap_err();
        assert_eq!(err, DataError::SymbolNotFound("XXX/YYY".into()));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time_series"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = source(&server).recent_bars("EUR/USD", 5).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_rejects_empty_key() {
        assert!(TwelveDataSource::new(TwelveDataConfig::new("  ")).is_err());
    }
}
