//! Per-tick outcome report.

use chrono::{DateTime, Utc};
use forex_core::types::{Signal, SinkOutcome, SinkStatus};
use serde::Serialize;
use std::fmt;

/// Why an instrument produced no signal this tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Fetch failed after retries, or failed permanently.
    FetchFailed { error: String },
    /// Bar was not newer than the last accepted bar.
    StaleBar { last: i64, received: i64 },
    /// Bar carried non-finite or non-positive prices.
    InvalidBar { error: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FetchFailed { error } => write!(f, "fetch failed: {}", error),
            SkipReason::StaleBar { last, received } => {
                write!(f, "stale bar {} (last accepted {})", received, last)
            }
            SkipReason::InvalidBar { error } => write!(f, "invalid bar: {}", error),
        }
    }
}

/// Result for one instrument.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstrumentResult {
    Dispatched {
        signal: Signal,
        outcomes: Vec<SinkOutcome>,
    },
    Skipped {
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct InstrumentReport {
    pub instrument: String,
    #[serde(flatten)]
    pub result: InstrumentResult,
}

/// Everything one tick did, in configured instrument order.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    /// 1-based tick counter
    pub tick: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub instruments: Vec<InstrumentReport>,
}

impl TickReport {
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.instruments.iter().filter_map(|r| match &r.result {
            InstrumentResult::Dispatched { signal, .. } => Some(signal),
            InstrumentResult::Skipped { .. } => None,
        })
    }

    pub fn dispatched(&self) -> usize {
        self.signals().count()
    }

    pub fn skipped(&self) -> usize {
        self.instruments.len() - self.dispatched()
    }

    pub fn alerts(&self) -> usize {
        self.signals().filter(|s| s.alert_triggered).count()
    }

    /// Sink calls that ended in `failed`.
    pub fn failed_deliveries(&self) -> usize {
        self.instruments
            .iter()
            .filter_map(|r| match &r.result {
                InstrumentResult::Dispatched { outcomes, .. } => Some(outcomes),
                InstrumentResult::Skipped { .. } => None,
            })
            .flatten()
            .filter(|o| o.is_failed())
            .count()
    }

    /// Find the report for an instrument.
    pub fn get(&self, instrument: &str) -> Option<&InstrumentResult> {
        self.instruments
            .iter()
            .find(|r| r.instrument == instrument)
            .map(|r| &r.result)
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();

        s.push_str(&format!(
            "Tick {} at {} ({} ms)\n",
            self.tick,
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.elapsed_ms
        ));
        s.push_str("───────────────────────────────────────────────────────────\n");

        for report in &self.instruments {
            match &report.result {
                InstrumentResult::Dispatched { signal, outcomes } => {
                    s.push_str(&format!(
                        "  {:<8} close {:.5}  RSI {:>6.2}  {:<9}  {}{}\n",
                        report.instrument,
                        signal.close,
                        signal.rsi,
                        signal.trend.to_string(),
                        signal.crossover_label(),
                        if signal.provisional { "  (provisional)" } else { "" }
                    ));
                    if signal.alert_triggered {
                        s.push_str(&format!("           ALERT: {}\n", signal.reasons_text()));
                    }
                    let sinks: Vec<String> = outcomes
                        .iter()
                        .map(|o| match o.status {
                            SinkStatus::Failed => format!(
                                "{}=failed after {} ({})",
                                o.sink_id,
                                o.attempts,
                                o.error.as_deref().unwrap_or("unknown")
                            ),
                            status => format!("{}={}", o.sink_id, status),
                        })
                        .collect();
                    s.push_str(&format!("           sinks: {}\n", sinks.join(", ")));
                }
                InstrumentResult::Skipped { reason } => {
                    s.push_str(&format!("  {:<8} skipped: {}\n", report.instrument, reason));
                }
            }
        }

        s
    }
}
