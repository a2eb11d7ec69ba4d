//! Signal sinks.
//!
//! Every destination implements [`SignalSink`](forex_core::SignalSink) and
//! writes idempotently on the `(instrument, timestamp)` key. The
//! [`SinkDispatcher`] fans a signal out to all of them concurrently.

mod dispatcher;
mod memory;
mod postgres;
mod sheet;
mod telegram;

pub use dispatcher::{RetryPolicy, SinkDispatcher};
pub use memory::MemorySink;
pub use postgres::PostgresSink;
pub use sheet::CsvSheetSink;
pub use telegram::{TelegramConfig, TelegramSink};

#[cfg(test)]
pub(crate) mod test_support;
