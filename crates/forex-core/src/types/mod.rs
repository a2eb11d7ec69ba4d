//! Core data types for the signal pipeline.

mod indicators;
mod ohlcv;
mod outcome;
mod signal;
mod timeframe;

pub use indicators::{Indicators, Reading};
pub use ohlcv::Bar;
pub use outcome::{SinkOutcome, SinkStatus};
pub use signal::{AlertReason, Crossover, MarketContext, SentimentLabel, Signal, Trend};
pub use timeframe::Timeframe;
