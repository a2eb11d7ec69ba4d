//! Streaming technical indicators.
//!
//! This crate provides incremental implementations of the indicators the
//! pipeline needs, plus the engine that owns their per-instrument state:
//! - Exponential moving average seeded by an arithmetic mean
//! - RSI and ATR with Wilder smoothing
//! - Rolling price channel for support and resistance
//!
//! Every indicator reports a provisional reading until its warm-up completes.

pub mod channel;
pub mod engine;
pub mod momentum;
pub mod moving_average;
pub mod volatility;

pub use channel::{Levels, PriceChannel};
pub use engine::{IndicatorEngine, IndicatorParams, IndicatorState};
pub use momentum::Rsi;
pub use moving_average::Ema;
pub use volatility::Atr;
