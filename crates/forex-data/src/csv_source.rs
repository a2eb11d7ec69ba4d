//! CSV bar source, one file per instrument.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use forex_core::error::DataError;
use forex_core::traits::DataSource;
use forex_core::types::Bar;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "datetime", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close")]
    close: f64,
}

/// File name for an instrument: `EUR/USD` is stored as `EUR_USD.csv`.
pub fn instrument_file_name(instrument: &str) -> String {
    format!("{}.csv", instrument.replace(['/', ':'], "_"))
}

#[derive(Debug, Default)]
struct ReplayState {
    bars: HashMap<String, Vec<Bar>>,
    cursors: HashMap<String, usize>,
}

/// Bars read from CSV files in a directory.
///
/// In snapshot mode every call re-reads the file, so rows appended by an
/// external writer show up on the next tick. In replay mode the file is read
/// once, `recent_bars` hands out its head and each `latest_bar` advances one
/// row, which lets a dry run walk through history tick by tick.
#[derive(Debug)]
pub struct CsvDataSource {
    dir: PathBuf,
    replay: bool,
    state: Mutex<ReplayState>,
}

impl CsvDataSource {
    /// Create a snapshot source over `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, DataError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DataError::Internal(format!(
                "CSV directory not found: {}",
                dir.display()
            )));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            replay: false,
            state: Mutex::new(ReplayState::default()),
        })
    }

    /// Switch to replay mode.
    pub fn replay(mut self) -> Self {
        self.replay = true;
        self
    }

    fn path_for(&self, instrument: &str) -> PathBuf {
        self.dir.join(instrument_file_name(instrument))
    }

    /// Load every bar for an instrument, oldest first.
    pub fn load_all(&self, instrument: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(instrument);
        if !path.exists() {
            return Err(DataError::SymbolNotFound(instrument.to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut bars = Vec::new();
        for result in reader.deserialize() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;
            bars.push(Bar::new(
                instrument,
                parse_timestamp(&record.date)?,
                record.open,
                record.high,
                record.low,
                record.close,
            ));
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!(instrument, path = %path.display(), bars = bars.len(), "Loaded CSV bars");
        Ok(bars)
    }

    fn cached(&self, state: &mut ReplayState, instrument: &str) -> Result<(), DataError> {
        if !state.bars.contains_key(instrument) {
            let bars = self.load_all(instrument)?;
            state.bars.insert(instrument.to_string(), bars);
        }
        Ok(())
    }

    async fn replay_window(&self, instrument: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        let mut state = self.state.lock().await;
        self.cached(&mut state, instrument)?;
        let bars = state.bars.get(instrument).cloned().unwrap_or_default();
        let end = count.min(bars.len());
        state.cursors.insert(instrument.to_string(), end);
        Ok(bars[..end].to_vec())
    }

    async fn replay_next(&self, instrument: &str) -> Result<Option<Bar>, DataError> {
        let mut state = self.state.lock().await;
        self.cached(&mut state, instrument)?;
        let cursor = state.cursors.entry(instrument.to_string()).or_insert(0);
        let index = *cursor;
        *cursor += 1;
        Ok(state.bars.get(instrument).and_then(|bars| bars.get(index)).cloned())
    }
}

#[async_trait]
impl DataSource for CsvDataSource {
    async fn recent_bars(&self, instrument: &str, count: usize) -> Result<Vec<Bar>, DataError> {
        let window = if self.replay {
            self.replay_window(instrument, count).await?
        } else {
            let mut bars = self.load_all(instrument)?;
            bars.split_off(bars.len().saturating_sub(count))
        };

        if window.is_empty() {
            return Err(DataError::NoDataAvailable(instrument.to_string()));
        }
        Ok(window)
    }

    async fn latest_bar(&self, instrument: &str) -> Result<Bar, DataError> {
        let bar = if self.replay {
            self.replay_next(instrument).await?
        } else {
            self.load_all(instrument)?.pop()
        };
        bar.ok_or_else(|| DataError::NoDataAvailable(instrument.to_string()))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Parse various timestamp formats.
fn parse_timestamp(date_str: &str) -> Result<i64, DataError> {
    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Some(dt) = NaiveDate::parse_from_str(date_str, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    // Unix timestamp, milliseconds if > 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}
