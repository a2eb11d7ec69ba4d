//! Per-instrument indicator state and the engine that owns it.

use crate::momentum::Rsi;
use crate::moving_average::Ema;
use crate::volatility::Atr;
use forex_core::error::IndicatorError;
use forex_core::traits::StreamingIndicator;
use forex_core::types::{Bar, Indicators};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Indicator periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_fast: 10,
            ema_slow: 50,
            rsi_period: 14,
            atr_period: 14,
        }
    }
}

impl IndicatorParams {
    /// Validate the periods.
    pub fn validate(&self) -> Result<(), IndicatorError> {
        let periods = [
            ("ema_fast", self.ema_fast),
            ("ema_slow", self.ema_slow),
            ("rsi_period", self.rsi_period),
            ("atr_period", self.atr_period),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(IndicatorError::InvalidParameter(format!(
                "{} must be greater than 0",
                name
            )));
        }
        if self.ema_fast >= self.ema_slow {
            return Err(IndicatorError::InvalidParameter(
                "ema_fast must be less than ema_slow".into(),
            ));
        }
        Ok(())
    }

    /// Bars needed before every indicator is warmed up.
    pub fn warmup_bars(&self) -> usize {
        self.ema_slow
            .max(self.rsi_period + 1)
            .max(self.atr_period + 1)
    }
}

/// Rolling state for one instrument.
///
/// Only [`IndicatorEngine::update`] mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorState {
    ema_fast: Ema,
    ema_slow: Ema,
    rsi: Rsi,
    atr: Atr,
    last_timestamp: Option<i64>,
    bars_seen: usize,
}

impl IndicatorState {
    fn new(params: &IndicatorParams) -> Self {
        Self {
            ema_fast: Ema::new(params.ema_fast),
            ema_slow: Ema::new(params.ema_slow),
            rsi: Rsi::new(params.rsi_period),
            atr: Atr::new(params.atr_period),
            last_timestamp: None,
            bars_seen: 0,
        }
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn last_timestamp(&self) -> Option<i64> {
        self.last_timestamp
    }

    pub fn prev_close(&self) -> Option<f64> {
        self.rsi.prev_close()
    }

    pub fn ema_fast(&self) -> Option<f64> {
        self.ema_fast.value()
    }

    pub fn ema_slow(&self) -> Option<f64> {
        self.ema_slow.value()
    }

    pub fn avg_gain(&self) -> f64 {
        self.rsi.avg_gain()
    }

    pub fn avg_loss(&self) -> f64 {
        self.rsi.avg_loss()
    }

    pub fn atr(&self) -> f64 {
        self.atr.value()
    }

    fn accepts(&self, bar: &Bar) -> Result<(), IndicatorError> {
        match self.last_timestamp {
            Some(last) if bar.timestamp <= last => Err(IndicatorError::StaleBar {
                instrument: bar.instrument.clone(),
                last,
                received: bar.timestamp,
            }),
            _ => Ok(()),
        }
    }

    fn apply(&mut self, bar: &Bar) -> Indicators {
        self.bars_seen += 1;
        self.last_timestamp = Some(bar.timestamp);
        Indicators {
            ema_fast: self.ema_fast.update(&bar.close),
            ema_slow: self.ema_slow.update(&bar.close),
            rsi: self.rsi.update(&bar.close),
            atr: self.atr.update(bar),
            bars_seen: self.bars_seen,
        }
    }
}

/// Owns indicator state for every instrument, addressed by instrument key.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    params: IndicatorParams,
    states: HashMap<String, IndicatorState>,
}

impl IndicatorEngine {
    /// Create an engine with validated periods.
    pub fn new(params: IndicatorParams) -> Result<Self, IndicatorError> {
        params.validate()?;
        Ok(Self {
            params,
            states: HashMap::new(),
        })
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Feed one bar and return the new indicator readings.
    ///
    /// Bars at or before the last accepted timestamp are rejected with
    /// [`IndicatorError::StaleBar`], as are malformed bars; neither mutates
    /// any state. Warm-up is not an error: readings are simply not ready.
    pub fn update(&mut self, bar: &Bar) -> Result<Indicators, IndicatorError> {
        if !bar.is_well_formed() {
            return Err(IndicatorError::InvalidParameter(format!(
                "malformed bar for {} at {}",
                bar.instrument, bar.timestamp
            )));
        }

        if let Some(state) = self.states.get(&bar.instrument) {
            state.accepts(bar)?;
        }

        let params = self.params;
        let state = self
            .states
            .entry(bar.instrument.clone())
            .or_insert_with(|| IndicatorState::new(&params));
        Ok(state.apply(bar))
    }

    /// State for an instrument, if it has seen any bar.
    pub fn state(&self, instrument: &str) -> Option<&IndicatorState> {
        self.states.get(instrument)
    }

    /// Instruments with state.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }
}
