//! Signal sink trait.

use crate::error::SinkError;
use crate::types::Signal;
use async_trait::async_trait;

/// What a sink did with a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The signal was stored or sent.
    Written,
    /// The sink deliberately ignored the signal.
    Skipped,
}

/// A downstream destination for finished signals.
///
/// Implementations must be idempotent on the signal's natural key
/// `(instrument, timestamp)`: delivering the same signal twice leaves
/// exactly one record behind.
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// Stable identifier used in outcomes and logs.
    fn id(&self) -> &str;

    /// Deliver one signal.
    async fn deliver(&self, signal: &Signal) -> Result<Delivery, SinkError>;
}
