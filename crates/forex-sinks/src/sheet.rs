//! Spreadsheet-style CSV sink.

use async_trait::async_trait;
use csv::{ReaderBuilder, WriterBuilder};
use forex_core::error::SinkError;
use forex_core::traits::{Delivery, SignalSink};
use forex_core::types::Signal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::debug;

/// One sheet row; column order matches the relational table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SheetRow {
    timestamp: String,
    ts_ms: i64,
    instrument: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    ema_fast: f64,
    ema_slow: f64,
    rsi: f64,
    atr: f64,
    support: f64,
    resistance: f64,
    trend: String,
    crossover: String,
    sentiment: String,
    news: String,
    alert_triggered: bool,
    alert_reasons: String,
    provisional: bool,
}

impl From<&Signal> for SheetRow {
    fn from(signal: &Signal) -> Self {
        Self {
            timestamp: signal.datetime().format("%Y-%m-%d %H:%M:%S").to_string(),
            ts_ms: signal.timestamp,
            instrument: signal.instrument.clone(),
            open: signal.open,
            high: signal.high,
            low: signal.low,
            close: signal.close,
            ema_fast: signal.ema_fast,
            ema_slow: signal.ema_slow,
            rsi: signal.rsi,
            atr: signal.atr,
            support: signal.support,
            resistance: signal.resistance,
            trend: signal.trend.to_string(),
            crossover: signal.crossover_label().to_string(),
            sentiment: signal.sentiment.to_string(),
            news: signal.news_text().to_string(),
            alert_triggered: signal.alert_triggered,
            alert_reasons: signal.reasons_text(),
            provisional: signal.provisional,
        }
    }
}

/// CSV file kept as a keyed table: one row per `(instrument, timestamp)`.
///
/// Each write replaces the matching row or appends a new one, then swaps
/// the whole file in through a uniquely named temporary sibling and a rename.
/// The file lock is held by the blocking write itself, so a write abandoned
/// by a timed-out caller still finishes before the next one reads the file.
#[derive(Debug)]
pub struct CsvSheetSink {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl CsvSheetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(path: &Path) -> Result<Vec<SheetRow>, SinkError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|e| SinkError::Storage(e.to_string()))?;
        reader
            .deserialize()
            .collect::<Result<Vec<SheetRow>, _>>()
            .map_err(|e| SinkError::Storage(format!("{}: {}", path.display(), e)))
    }

    fn write_rows(path: &Path, rows: &[SheetRow]) -> Result<(), SinkError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = WriterBuilder::new()
                .has_headers(true)
                .from_writer(tmp.as_file());
            for row in rows {
                writer
                    .serialize(row)
                    .map_err(|e| SinkError::Serialization(e.to_string()))?;
            }
            writer.flush()?;
        }
        tmp.persist(path).map_err(|e| SinkError::Io(e.error.to_string()))?;
        Ok(())
    }

    fn upsert(path: &Path, row: SheetRow) -> Result<(), SinkError> {
        let mut rows = Self::read_rows(path)?;
        match rows
            .iter_mut()
            .find(|r| r.instrument == row.instrument && r.ts_ms == row.ts_ms)
        {
            Some(existing) => *existing = row,
            None => rows.push(row),
        }
        Self::write_rows(path, &rows)
    }
}

#[async_trait]
impl SignalSink for CsvSheetSink {
    fn id(&self) -> &str {
        "sheet"
    }

    async fn deliver(&self, signal: &Signal) -> Result<Delivery, SinkError> {
        let lock = Arc::clone(&self.lock);
        let path = self.path.clone();
        let row = SheetRow::from(signal);

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            Self::upsert(&path, row)
        })
        .await
        .map_err(|e| SinkError::Io(e.to_string()))??;

        debug!(path = %self.path.display(), instrument = %signal.instrument, "Sheet row written");
        Ok(Delivery::Written)
    }
}
