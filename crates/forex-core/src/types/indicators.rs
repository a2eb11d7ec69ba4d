//! Indicator readings produced by the indicator engine.

use serde::{Deserialize, Serialize};

/// A single indicator value together with its warm-up status.
///
/// While `ready` is false the value is a provisional estimate built from
/// the bars seen so far and must not drive alerts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    pub ready: bool,
}

impl Reading {
    /// A warmed-up value.
    pub fn ready(value: f64) -> Self {
        Self { value, ready: true }
    }

    /// A provisional value.
    pub fn provisional(value: f64) -> Self {
        Self {
            value,
            ready: false,
        }
    }

    /// The value, only if warmed up.
    pub fn ready_value(&self) -> Option<f64> {
        self.ready.then_some(self.value)
    }
}

/// Indicator output for one accepted bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub ema_fast: Reading,
    pub ema_slow: Reading,
    pub rsi: Reading,
    pub atr: Reading,
    /// Accepted bars for the instrument, including this one
    pub bars_seen: usize,
}

impl Indicators {
    /// Whether every indicator has left its warm-up period.
    pub fn is_warmed_up(&self) -> bool {
        self.ema_fast.ready && self.ema_slow.ready && self.rsi.ready && self.atr.ready
    }

    /// Both EMAs, only when both are warmed up.
    pub fn emas(&self) -> Option<(f64, f64)> {
        Some((self.ema_fast.ready_value()?, self.ema_slow.ready_value()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_ready_value() {
        assert_eq!(Reading::ready(1.5).ready_value(), Some(1.5));
        assert_eq!(Reading::provisional(1.5).ready_value(), None);
    }

    #[test]
    fn test_warm_up_requires_every_reading() {
        let mut indicators = Indicators {
            ema_fast: Reading::ready(1.1),
            ema_slow: Reading::provisional(1.0),
            rsi: Reading::ready(55.0),
            atr: Reading::ready(0.001),
            bars_seen: 20,
        };
        assert!(!indicators.is_warmed_up());
        assert!(indicators.emas().is_none());

        indicators.ema_slow = Reading::ready(1.0);
        assert!(indicators.is_warmed_up());
        assert_eq!(indicators.emas(), Some((1.1, 1.0)));
    }
}
