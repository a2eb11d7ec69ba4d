//! Signal evaluation.
//!
//! Turns indicator readings into a finished [`Signal`](forex_core::Signal):
//! trend, edge-triggered crossovers, support and resistance, fused
//! sentiment and the alert decision.

pub mod config;
pub mod evaluator;
pub mod rules;

pub use config::{AlertConfig, InvalidAlertConfig, RsiBands, ThresholdRule};
pub use evaluator::SignalEvaluator;
pub use rules::RsiZone;
