//! Concurrent fan-out with per-sink timeout and retry.

use backon::{ExponentialBuilder, Retryable};
use forex_core::error::SinkError;
use forex_core::traits::{Delivery, SignalSink};
use forex_core::types::{Signal, SinkOutcome};
use futures::future::join_all;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Timeout and retry settings applied to every sink call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts per sink per dispatch, first call included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .with_jitter()
    }
}

/// Delivers each signal to every configured sink.
///
/// Sinks run concurrently and independently: one sink failing, timing out
/// or retrying never delays the outcome of another beyond the slowest call.
pub struct SinkDispatcher {
    sinks: Vec<Arc<dyn SignalSink>>,
    policy: RetryPolicy,
}

impl SinkDispatcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            sinks: Vec::new(),
            policy,
        }
    }

    /// Add a sink.
    pub fn with_sink(mut self, sink: Arc<dyn SignalSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn add_sink(&mut self, sink: Arc<dyn SignalSink>) {
        self.sinks.push(sink);
    }

    pub fn sink_ids(&self) -> Vec<&str> {
        self.sinks.iter().map(|s| s.id()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Deliver one signal everywhere, one outcome per sink in sink order.
    pub async fn dispatch(&self, signal: &Signal) -> Vec<SinkOutcome> {
        join_all(
            self.sinks
                .iter()
                .map(|sink| self.deliver_one(sink.as_ref(), signal)),
        )
        .await
    }

    async fn deliver_one(&self, sink: &dyn SignalSink, signal: &Signal) -> SinkOutcome {
        let attempts = AtomicU32::new(0);
        let timeout = self.policy.timeout;

        let result = (|| {
            attempts.fetch_add(1, Ordering::Relaxed);
            let delivery = sink.deliver(signal);
            async move {
                tokio::time::timeout(timeout, delivery)
                    .await
                    .unwrap_or(Err(SinkError::Timeout(timeout)))
            }
        })
        .retry(self.policy.backoff())
        .sleep(tokio::time::sleep)
        .when(|e: &SinkError| e.is_transient())
        .notify(|err: &SinkError, dur: Duration| {
            warn!(
                sink = sink.id(),
                instrument = %signal.instrument,
                timestamp = signal.timestamp,
                error = %err,
                retry_in_ms = dur.as_millis() as u64,
                "Sink delivery failed, retrying"
            );
        })
        .await;

        let attempts = attempts.load(Ordering::Relaxed);
        match result {
            Ok(Delivery::Written) => {
                debug!(
                    sink = sink.id(),
                    instrument = %signal.instrument,
                    attempts,
                    "Signal delivered"
                );
                SinkOutcome::success(sink.id(), attempts)
            }
            Ok(Delivery::Skipped) => SinkOutcome::skipped(sink.id(), attempts),
            Err(e) => {
                warn!(
                    sink = sink.id(),
                    instrument = %signal.instrument,
                    timestamp = signal.timestamp,
                    attempts,
                    error = %e,
                    "Sink delivery failed"
                );
                SinkOutcome::failed(sink.id(), attempts, e.to_string())
            }
        }
    }
}
