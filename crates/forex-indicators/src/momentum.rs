//! Momentum indicators.

use forex_core::traits::StreamingIndicator;
use forex_core::types::Reading;

/// Neutral RSI reported when no price change has been seen.
const NEUTRAL_RSI: f64 = 50.0;

/// Streaming Relative Strength Index (RSI) with Wilder smoothing.
///
/// The first `period` close-to-close changes seed the average gain and loss
/// by arithmetic mean; afterwards `avg = (prev_avg * (period-1) + x) / period`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rsi {
    period: usize,
    prev_close: Option<f64>,
    changes: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
}

impl Rsi {
    /// Create a new RSI indicator.
    ///
    /// Common periods are 14 (default) or 9.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            prev_close: None,
            changes: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        }
    }

    /// Convert smoothed averages into an RSI value.
    ///
    /// A flat series (no gains, no losses) is neutral.
    pub fn from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_loss == 0.0 && avg_gain == 0.0 {
            NEUTRAL_RSI
        } else if avg_loss == 0.0 {
            100.0
        } else if avg_gain == 0.0 {
            0.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        }
    }

    /// Smoothed average gain.
    pub fn avg_gain(&self) -> f64 {
        self.avg_gain
    }

    /// Smoothed average loss.
    pub fn avg_loss(&self) -> f64 {
        self.avg_loss
    }

    /// Last close fed to the indicator.
    pub fn prev_close(&self) -> Option<f64> {
        self.prev_close
    }

    fn value(&self) -> f64 {
        Self::from_averages(self.avg_gain, self.avg_loss)
    }
}

impl StreamingIndicator for Rsi {
    type Input = f64;

    fn update(&mut self, close: &f64) -> Reading {
        let close = *close;
        let Some(prev) = self.prev_close.replace(close) else {
            return Reading::provisional(NEUTRAL_RSI);
        };

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        self.changes += 1;

        if self.changes <= self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            self.avg_gain = self.gain_sum / self.changes as f64;
            self.avg_loss = self.loss_sum / self.changes as f64;
        } else {
            let period = self.period as f64;
            self.avg_gain = (self.avg_gain * (period - 1.0) + gain) / period;
            self.avg_loss = (self.avg_loss * (period - 1.0) + loss) / period;
        }

        Reading {
            value: self.value(),
            ready: self.is_ready(),
        }
    }

    fn current(&self) -> Option<Reading> {
        self.prev_close?;
        Some(Reading {
            value: self.value(),
            ready: self.is_ready(),
        })
    }

    fn reset(&mut self) {
        *self = Self::new(self.period);
    }

    fn is_ready(&self) -> bool {
        self.changes >= self.period
    }

    /// Changes needed for the seed; the first ready value needs `period + 1` bars.
    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "RSI"
    }
}
