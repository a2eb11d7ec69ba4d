//! Volatility indicators.

use forex_core::traits::StreamingIndicator;
use forex_core::types::{Bar, Reading};

/// Streaming Average True Range (ATR).
///
/// Measures market volatility by decomposing the entire range
/// of an asset price for that period. The first `period` true ranges
/// seed the average, then Wilder smoothing applies.
#[derive(Debug, Clone, PartialEq)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    count: usize,
    tr_sum: f64,
    atr: f64,
}

impl Atr {
    /// Create a new ATR indicator.
    ///
    /// Common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            prev_close: None,
            count: 0,
            tr_sum: 0.0,
            atr: 0.0,
        }
    }

    /// Smoothed ATR, zero before the first true range.
    pub fn value(&self) -> f64 {
        self.atr
    }
}

impl StreamingIndicator for Atr {
    type Input = Bar;

    fn update(&mut self, bar: &Bar) -> Reading {
        // The first bar has no previous close, so it contributes no true range
        let Some(prev_close) = self.prev_close.replace(bar.close) else {
            return Reading::provisional(bar.range());
        };

        let tr = bar.true_range(Some(prev_close));
        self.count += 1;

        if self.count <= self.period {
            self.tr_sum += tr;
            self.atr = self.tr_sum / self.count as f64;
        } else {
            let period = self.period as f64;
            self.atr = (self.atr * (period - 1.0) + tr) / period;
        }

        Reading {
            value: self.atr,
            ready: self.is_ready(),
        }
    }

    fn current(&self) -> Option<Reading> {
        self.prev_close?;
        Some(Reading {
            value: self.atr,
            ready: self.is_ready(),
        })
    }

    fn reset(&mut self) {
        *self = Self::new(self.period);
    }

    fn is_ready(&self) -> bool {
        self.count >= self.period
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "ATR"
    }
}
