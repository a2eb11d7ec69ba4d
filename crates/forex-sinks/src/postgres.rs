//! PostgreSQL sink.

use async_trait::async_trait;
use forex_core::error::SinkError;
use forex_core::traits::{Delivery, SignalSink};
use forex_core::types::Signal;
use tokio::sync::RwLock;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS forex_signals (
    ts TIMESTAMPTZ NOT NULL,
    instrument TEXT NOT NULL,
    open DOUBLE PRECISION NOT NULL,
    high DOUBLE PRECISION NOT NULL,
    low DOUBLE PRECISION NOT NULL,
    close DOUBLE PRECISION NOT NULL,
    ema_fast DOUBLE PRECISION NOT NULL,
    ema_slow DOUBLE PRECISION NOT NULL,
    rsi DOUBLE PRECISION NOT NULL,
    atr DOUBLE PRECISION NOT NULL,
    support DOUBLE PRECISION NOT NULL,
    resistance DOUBLE PRECISION NOT NULL,
    trend TEXT NOT NULL,
    crossover TEXT NOT NULL,
    sentiment TEXT NOT NULL,
    news TEXT NOT NULL,
    alert_triggered BOOLEAN NOT NULL,
    alert_reasons TEXT NOT NULL,
    provisional BOOLEAN NOT NULL,
    PRIMARY KEY (instrument, ts)
)";

const UPSERT: &str = "INSERT INTO forex_signals (
    ts, instrument, open, high, low, close, ema_fast, ema_slow, rsi, atr,
    support, resistance, trend, crossover, sentiment, news,
    alert_triggered, alert_reasons, provisional
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
ON CONFLICT (instrument, ts) DO UPDATE SET
    open = EXCLUDED.open,
    high = EXCLUDED.high,
    low = EXCLUDED.low,
    close = EXCLUDED.close,
    ema_fast = EXCLUDED.ema_fast,
    ema_slow = EXCLUDED.ema_slow,
    rsi = EXCLUDED.rsi,
    atr = EXCLUDED.atr,
    support = EXCLUDED.support,
    resistance = EXCLUDED.resistance,
    trend = EXCLUDED.trend,
    crossover = EXCLUDED.crossover,
    sentiment = EXCLUDED.sentiment,
    news = EXCLUDED.news,
    alert_triggered = EXCLUDED.alert_triggered,
    alert_reasons = EXCLUDED.alert_reasons,
    provisional = EXCLUDED.provisional";

/// Upserts signals into the `forex_signals` table.
///
/// The connection is opened on first use and reopened after it drops, so
/// a database that is down at startup does not stop the pipeline.
pub struct PostgresSink {
    url: String,
    client: RwLock<Option<Client>>,
}

impl PostgresSink {
    /// Create a sink without connecting yet.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: RwLock::new(None),
        }
    }

    async fn open(&self) -> Result<Client, SinkError> {
        let (client, connection) = tokio_postgres::connect(&self.url, NoTls)
            .await
            .map_err(|e| SinkError::Connection(format!("Failed to connect to PostgreSQL: {}", e)))?;

        // Spawn connection task
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        client.execute(CREATE_TABLE, &[]).await.map_err(classify)?;
        info!("Connected to PostgreSQL, forex_signals table ready");
        Ok(client)
    }

    async fn ensure_connected(&self) -> Result<(), SinkError> {
        {
            let guard = self.client.read().await;
            if guard.as_ref().is_some_and(|c| !c.is_closed()) {
                return Ok(());
            }
        }
        let mut guard = self.client.write().await;
        if guard.as_ref().is_some_and(|c| !c.is_closed()) {
            return Ok(());
        }
        *guard = Some(self.open().await?);
        Ok(())
    }
}

/// Map a driver error onto transient or permanent sink errors.
fn classify(err: tokio_postgres::Error) -> SinkError {
    if err.is_closed() {
        return SinkError::Connection(err.to_string());
    }
    match err.code() {
        Some(code) if code.code().starts_with("08") => SinkError::Connection(err.to_string()),
        // Data, integrity and syntax classes will fail the same way again
        Some(code) if ["22", "23", "42"].iter().any(|c| code.code().starts_with(c)) => {
            SinkError::Rejected(err.to_string())
        }
        _ => SinkError::Storage(err.to_string()),
    }
}

#[async_trait]
impl SignalSink for PostgresSink {
    fn id(&self) -> &str {
        "postgres"
    }

    async fn deliver(&self, signal: &Signal) -> Result<Delivery, SinkError> {
        self.ensure_connected().await?;

        let guard = self.client.read().await;
        let client = guard
            .as_ref()
            .ok_or_else(|| SinkError::Connection("PostgreSQL client not connected".into()))?;

        let ts = signal.datetime();
        let trend = signal.trend.to_string();
        let sentiment = signal.sentiment.to_string();
        let reasons = signal.reasons_text();

        let result = client
            .execute(
                UPSERT,
                &[
                    &ts,
                    &signal.instrument,
                    &signal.open,
                    &signal.high,
                    &signal.low,
                    &signal.close,
                    &signal.ema_fast,
                    &signal.ema_slow,
                    &signal.rsi,
                    &signal.atr,
                    &signal.support,
                    &signal.resistance,
                    &trend,
                    &signal.crossover_label(),
                    &sentiment,
                    &signal.news_text(),
                    &signal.alert_triggered,
                    &reasons,
                    &signal.provisional,
                ],
            )
            .await;

        match result {
            Ok(_) => {
                debug!(
                    instrument = %signal.instrument,
                    timestamp = signal.timestamp,
                    "Signal upserted"
                );
                Ok(Delivery::Written)
            }
            Err(e) => {
                let err = classify(e);
                if matches!(err, SinkError::Connection(_)) {
                    drop(guard);
                    // Force a reconnect on the next attempt
                    *self.client.write().await = None;
                }
                Err(err)
            }
        }
    }
}
