//! Telegram Bot API notification sink.

use async_trait::async_trait;
use forex_core::error::SinkError;
use forex_core::traits::{Delivery, SignalSink};
use forex_core::types::Signal;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Public Bot API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Delivered keys remembered for replay suppression.
const DEFAULT_MEMORY: usize = 1024;

/// Bot credentials and endpoint.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Bounded FIFO set of delivered keys.
#[derive(Debug)]
struct Delivered {
    capacity: usize,
    order: VecDeque<(String, i64)>,
    keys: HashSet<(String, i64)>,
}

impl Delivered {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            keys: HashSet::new(),
        }
    }

    #[cfg(test)]
    fn contains(&self, key: &(String, i64)) -> bool {
        self.keys.contains(key)
    }

    /// Returns false when the key is already present.
    fn insert(&mut self, key: (String, i64)) -> bool {
        if !self.keys.insert(key.clone()) {
            return false;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.keys.remove(&oldest);
            }
        }
        true
    }

    fn remove(&mut self, key: &(String, i64)) {
        if self.keys.remove(key) {
            self.order.retain(|k| k != key);
        }
    }
}

fn lock(delivered: &Mutex<Delivered>) -> MutexGuard<'_, Delivered> {
    delivered.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A key claimed before sending. Dropping it without `commit` gives the key
/// back, including when the send future is cancelled by a timeout.
struct Reservation<'a> {
    delivered: &'a Mutex<Delivered>,
    key: Option<(String, i64)>,
}

impl<'a> Reservation<'a> {
    fn claim(delivered: &'a Mutex<Delivered>, key: (String, i64)) -> Option<Self> {
        lock(delivered).insert(key.clone()).then(|| Self {
            delivered,
            key: Some(key),
        })
    }

    fn commit(mut self) {
        self.key = None;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock(self.delivered).remove(&key);
        }
    }
}

/// Sends alerting signals to a Telegram chat.
///
/// Non-alerting signals and replays of already-sent keys are skipped.
pub struct TelegramSink {
    config: TelegramConfig,
    client: Client,
    delivered: Mutex<Delivered>,
}

impl TelegramSink {
    pub fn new(config: TelegramConfig) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Connection(e.to_string()))?;
        Ok(Self {
            config,
            client,
            delivered: Mutex::new(Delivered::new(DEFAULT_MEMORY)),
        })
    }

    /// Alert text for a signal.
    pub fn format_message(signal: &Signal) -> String {
        let mut text = format!(
            "🚨 {} Alert\n\
             Time: {}\n\
             Price: {:.5}\n\
             RSI: {:.2}\n\
             EMA fast/slow: {:.5} / {:.5}\n\
             Trend: {}\n\
             Crossover: {}\n\
             ATR: {:.5}\n\
             Support/Resistance: {:.5} / {:.5}\n\
             Sentiment: {}\n\
             News: {}",
            signal.instrument,
            signal.datetime().format("%Y-%m-%d %H:%M:%S UTC"),
            signal.close,
            signal.rsi,
            signal.ema_fast,
            signal.ema_slow,
            signal.trend,
            signal.crossover_label(),
            signal.atr,
            signal.support,
            signal.resistance,
            signal.sentiment,
            signal.news_text(),
        );
        if !signal.alert_reasons.is_empty() {
            text.push_str("\nReasons: ");
            text.push_str(&signal.reasons_text());
        }
        if signal.provisional {
            text.push_str("\n(indicators still warming up)");
        }
        text
    }

    fn status_error(status: StatusCode, body: &str) -> SinkError {
        let parsed: ApiError = serde_json::from_str(body).unwrap_or_default();
        let description = parsed
            .description
            .unwrap_or_else(|| body.chars().take(200).collect());

        if status == StatusCode::TOO_MANY_REQUESTS {
            SinkError::RateLimited {
                retry_after_secs: parsed
                    .parameters
                    .and_then(|p| p.retry_after)
                    .unwrap_or(1),
            }
        } else if status.is_server_error() {
            SinkError::Unavailable(format!("{}: {}", status, description))
        } else {
            SinkError::Rejected(format!("{}: {}", status, description))
        }
    }
}

#[async_trait]
impl SignalSink for TelegramSink {
    fn id(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, signal: &Signal) -> Result<Delivery, SinkError> {
        if !signal.alert_triggered {
            return Ok(Delivery::Skipped);
        }

        let key = (signal.instrument.clone(), signal.timestamp);
        let Some(reservation) = Reservation::claim(&self.delivered, key) else {
            debug!(
                instrument = %signal.instrument,
                timestamp = signal.timestamp,
                "Alert already sent"
            );
            return Ok(Delivery::Skipped);
        };

        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.base_url.trim_end_matches('/'),
            self.config.bot_token
        );
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            text: Self::format_message(signal),
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SinkError::Timeout(self.config.timeout)
                } else {
                    SinkError::Connection(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &text));
        }

        reservation.commit();
        info!(instrument = %signal.instrument, timestamp = signal.timestamp, "Telegram alert sent");
        Ok(Delivery::Written)
    }
}
