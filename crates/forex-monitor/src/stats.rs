//! Running delivery statistics per sink.

use forex_core::types::{SinkOutcome, SinkStatus};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Outcome counts for one sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkCounters {
    pub success: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Attempts beyond the first
    pub retries: u64,
}

/// Totals since process start.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryStats {
    pub ticks: u64,
    pub signals: u64,
    pub alerts: u64,
    sinks: BTreeMap<String, SinkCounters>,
}

impl DeliveryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcomes of dispatching one signal.
    pub fn record(&mut self, alert: bool, outcomes: &[SinkOutcome]) {
        self.signals += 1;
        if alert {
            self.alerts += 1;
        }
        for outcome in outcomes {
            let counters = self.sinks.entry(outcome.sink_id.clone()).or_default();
            match outcome.status {
                SinkStatus::Success => counters.success += 1,
                SinkStatus::Skipped => counters.skipped += 1,
                SinkStatus::Failed => counters.failed += 1,
            }
            counters.retries += u64::from(outcome.attempts.saturating_sub(1));
        }
    }

    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    pub fn sink(&self, sink_id: &str) -> Option<&SinkCounters> {
        self.sinks.get(sink_id)
    }

    /// Log one line per sink.
    pub fn log_summary(&self) {
        info!(
            ticks = self.ticks,
            signals = self.signals,
            alerts = self.alerts,
            "Delivery totals"
        );
        for (sink, c) in &self.sinks {
            info!(
                sink = %sink,
                success = c.success,
                skipped = c.skipped,
                failed = c.failed,
                retries = c.retries,
                "Sink totals"
            );
        }
    }
}
