//! Per-sink delivery outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Final status of one sink for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkStatus {
    Success,
    /// The sink chose not to act on this signal.
    Skipped,
    Failed,
}

impl fmt::Display for SinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SinkStatus::Success => "success",
            SinkStatus::Skipped => "skipped",
            SinkStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Observability record for one sink and one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkOutcome {
    pub sink_id: String,
    pub status: SinkStatus,
    /// Number of delivery attempts made, retries included
    pub attempts: u32,
    pub error: Option<String>,
}

impl SinkOutcome {
    pub fn success(sink_id: impl Into<String>, attempts: u32) -> Self {
        Self {
            sink_id: sink_id.into(),
            status: SinkStatus::Success,
            attempts,
            error: None,
        }
    }

    pub fn skipped(sink_id: impl Into<String>, attempts: u32) -> Self {
        Self {
            sink_id: sink_id.into(),
            status: SinkStatus::Skipped,
            attempts,
            error: None,
        }
    }

    pub fn failed(sink_id: impl Into<String>, attempts: u32, error: impl Into<String>) -> Self {
        Self {
            sink_id: sink_id.into(),
            status: SinkStatus::Failed,
            attempts,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == SinkStatus::Failed
    }
}
