//! Logging setup and delivery statistics.

mod logging;
mod stats;

pub use logging::{setup_logging, LogOptions, LoggingError};
pub use stats::{DeliveryStats, SinkCounters};
pub use tracing_appender::non_blocking::WorkerGuard;
