//! Rolling price channel for support and resistance.

use forex_core::types::Bar;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Support and resistance over the lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    /// Lowest low in the window
    pub support: f64,
    /// Highest high in the window
    pub resistance: f64,
    /// Whether the window is full
    pub ready: bool,
}

/// Rolling min(low) / max(high) over the last `lookback` bars.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceChannel {
    lookback: usize,
    window: VecDeque<(f64, f64)>,
}

impl PriceChannel {
    /// Create a channel over the last `lookback` bars.
    pub fn new(lookback: usize) -> Self {
        assert!(lookback > 0, "Lookback must be greater than 0");
        Self {
            lookback,
            window: VecDeque::with_capacity(lookback),
        }
    }

    /// Push a bar, evicting the oldest once the window is full.
    pub fn update(&mut self, bar: &Bar) -> Levels {
        if self.window.len() >= self.lookback {
            self.window.pop_front();
        }
        self.window
            .push_back((bar.low.min(bar.high), bar.high.max(bar.low)));
        self.levels().unwrap_or(Levels {
            support: bar.low,
            resistance: bar.high,
            ready: false,
        })
    }

    /// Current levels, `None` before the first bar.
    pub fn levels(&self) -> Option<Levels> {
        if self.window.is_empty() {
            return None;
        }
        let support = self
            .window
            .iter()
            .map(|(low, _)| *low)
            .fold(f64::INFINITY, f64::min);
        let resistance = self
            .window
            .iter()
            .map(|(_, high)| *high)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(Levels {
            support,
            resistance,
            ready: self.window.len() >= self.lookback,
        })
    }

    /// Number of bars in the window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Check if the window is empty.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, high: f64, low: f64) -> Bar {
        Bar::new("GBP/USD", ts, low, high, low, high)
    }

    #[test]
    fn test_channel_tracks_extremes() {
        let mut channel = PriceChannel::new(3);
        channel.update(&bar(1, 1.30, 1.20));
        channel.update(&bar(2, 1.35, 1.25));
        let levels = channel.update(&bar(3, 1.28, 1.22));

        assert!(levels.ready);
        assert_eq!(levels.support, 1.20);
        assert_eq!(levels.resistance, 1.35);
    }

    #[test]
    fn test_channel_evicts_oldest_bar() {
        let mut channel = PriceChannel::new(2);
        channel.update(&bar(1, 1.40, 1.10));
        channel.update(&bar(2, 1.30, 1.20));
        let levels = channel.update(&bar(3, 1.32, 1.21));

        assert_eq!(channel.len(), 2);
        assert_eq!(levels.support, 1.20);
        assert_eq!(levels.resistance, 1.32);
    }

    #[test]
    fn test_channel_not_ready_until_full() {
        let mut channel = PriceChannel::new(20);
        assert!(channel.levels().is_none());
        let levels = channel.update(&bar(1, 1.30, 1.20));
        assert!(!levels.ready);
        assert_eq!(levels.support, 1.20);
        assert_eq!(levels.resistance, 1.30);
    }
}
