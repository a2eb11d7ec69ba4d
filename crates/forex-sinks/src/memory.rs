//! In-memory sink for dry runs and tests.

use async_trait::async_trait;
use forex_core::error::SinkError;
use forex_core::traits::{Delivery, SignalSink};
use forex_core::types::Signal;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Keeps the latest signal per `(instrument, timestamp)`.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RwLock<BTreeMap<(String, i64), Signal>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Stored signals ordered by instrument, then timestamp.
    pub async fn records(&self) -> Vec<Signal> {
        self.records.read().await.values().cloned().collect()
    }

    pub async fn get(&self, instrument: &str, timestamp: i64) -> Option<Signal> {
        self.records
            .read()
            .await
            .get(&(instrument.to_string(), timestamp))
            .cloned()
    }
}

#[async_trait]
impl SignalSink for MemorySink {
    fn id(&self) -> &str {
        "memory"
    }

    async fn deliver(&self, signal: &Signal) -> Result<Delivery, SinkError> {
        let key = (signal.instrument.clone(), signal.timestamp);
        self.records.write().await.insert(key, signal.clone());
        Ok(Delivery::Written)
    }
}
