//! Core types and traits for the forex signal pipeline.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, Timeframe, MarketContext)
//! - Indicator readings and the finished Signal
//! - Sink delivery outcomes
//! - Core traits for data sources, news sources, streaming indicators and sinks

pub mod error;
pub mod traits;
pub mod types;

pub use error::{DataError, IndicatorError, PipelineError, SinkError};
pub use traits::*;
pub use types::*;
