//! Moving average indicators.

use forex_core::traits::StreamingIndicator;
use forex_core::types::Reading;

/// Streaming Exponential Moving Average (EMA).
///
/// The first `period` values are averaged arithmetically to seed the EMA.
/// Until then the reading is the running mean and is marked provisional.
#[derive(Debug, Clone, PartialEq)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    current: Option<f64>,
    count: usize,
    sum: f64,
}

impl Ema {
    /// Create a new streaming EMA.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        let multiplier = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            multiplier,
            current: None,
            count: 0,
            sum: 0.0,
        }
    }

    /// Current value, seeded or provisional.
    pub fn value(&self) -> Option<f64> {
        self.current
    }
}

impl StreamingIndicator for Ema {
    type Input = f64;

    fn update(&mut self, value: &f64) -> Reading {
        let value = *value;
        self.count += 1;

        if self.count <= self.period {
            // Accumulating for the seed mean
            self.sum += value;
            let mean = self.sum / self.count as f64;
            self.current = Some(mean);
            Reading {
                value: mean,
                ready: self.count == self.period,
            }
        } else {
            let prev = self.current.unwrap_or(value);
            let ema = value * self.multiplier + prev * (1.0 - self.multiplier);
            self.current = Some(ema);
            Reading::ready(ema)
        }
    }

    fn current(&self) -> Option<Reading> {
        self.current.map(|value| Reading {
            value,
            ready: self.is_ready(),
        })
    }

    fn reset(&mut self) {
        self.current = None;
        self.count = 0;
        self.sum = 0.0;
    }

    fn is_ready(&self) -> bool {
        self.count >= self.period
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}
