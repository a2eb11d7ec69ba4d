//! Alert configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid alert configuration.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid alert configuration: {0}")]
pub struct InvalidAlertConfig(pub String);

/// Absolute price levels watched for one instrument.
///
/// `above` fires when the close moves from at or below the level to above
/// it; `below` fires on the opposite move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub instrument: String,
    #[serde(default)]
    pub above: Option<f64>,
    #[serde(default)]
    pub below: Option<f64>,
}

impl ThresholdRule {
    pub fn above(instrument: impl Into<String>, level: f64) -> Self {
        Self {
            instrument: instrument.into(),
            above: Some(level),
            below: None,
        }
    }

    pub fn below(instrument: impl Into<String>, level: f64) -> Self {
        Self {
            instrument: instrument.into(),
            above: None,
            below: Some(level),
        }
    }
}

/// RSI zone boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiBands {
    /// RSI at or above this is overbought
    pub overbought: f64,
    /// RSI at or below this is oversold
    pub oversold: f64,
}

impl Default for RsiBands {
    fn default() -> Self {
        Self {
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

/// Everything the evaluator needs besides indicator periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub thresholds: Vec<ThresholdRule>,
    pub rsi_bands: RsiBands,
    /// Bars in the support/resistance window
    pub levels_lookback: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            thresholds: Vec::new(),
            rsi_bands: RsiBands::default(),
            levels_lookback: 20,
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), InvalidAlertConfig> {
        if self.levels_lookback == 0 {
            return Err(InvalidAlertConfig(
                "levels_lookback must be greater than 0".into(),
            ));
        }
        let bands = &self.rsi_bands;
        if !(0.0..=100.0).contains(&bands.oversold) || !(0.0..=100.0).contains(&bands.overbought) {
            return Err(InvalidAlertConfig(
                "RSI bands must lie within 0..=100".into(),
            ));
        }
        if bands.overbought <= bands.oversold {
            return Err(InvalidAlertConfig(
                "RSI overbought must be greater than oversold".into(),
            ));
        }
        for rule in &self.thresholds {
            if rule.instrument.trim().is_empty() {
                return Err(InvalidAlertConfig("threshold without instrument".into()));
            }
            if rule.above.is_none() && rule.below.is_none() {
                return Err(InvalidAlertConfig(format!(
                    "threshold for {} sets neither above nor below",
                    rule.instrument
                )));
            }
            let mut levels = rule.above.into_iter().chain(rule.below);
            if levels.any(|l| !l.is_finite() || l <= 0.0) {
                return Err(InvalidAlertConfig(format!(
                    "threshold for {} must be a positive price",
                    rule.instrument
                )));
            }
        }
        Ok(())
    }

    /// Threshold rules for one instrument.
    pub fn thresholds_for<'a>(
        &'a self,
        instrument: &'a str,
    ) -> impl Iterator<Item = &'a ThresholdRule> + 'a {
        self.thresholds
            .iter()
            .filter(move |rule| rule.instrument == instrument)
    }
}
