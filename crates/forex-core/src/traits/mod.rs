//! Core traits for the signal pipeline.

mod data_source;
mod indicator;
mod sink;

pub use data_source::{DataSource, NewsSource};
pub use indicator::StreamingIndicator;
pub use sink::{Delivery, SignalSink};
