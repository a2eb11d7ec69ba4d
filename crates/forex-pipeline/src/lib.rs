//! Polling orchestrator.
//!
//! Each tick fetches the latest bar for every instrument, feeds accepted
//! bars through the indicator engine and the signal evaluator, and fans the
//! resulting signals out to every configured sink.

mod builder;
mod pipeline;
mod report;

pub use builder::build_pipeline;
pub use pipeline::{FetchPolicy, Pipeline, PipelineOptions};
pub use report::{InstrumentReport, InstrumentResult, SkipReason, TickReport};
