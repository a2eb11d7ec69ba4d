//! OHLC bar type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized price bar for one instrument.
///
/// Currency pairs carry no meaningful volume, so only OHLC is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Instrument identifier, e.g. `EUR/USD`
    pub instrument: String,
    /// Unix timestamp in milliseconds (bar open time, UTC)
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(
        instrument: impl Into<String>,
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Bar whose OHLC values all equal `price`.
    pub fn flat(instrument: impl Into<String>, timestamp: i64, price: f64) -> Self {
        Self::new(instrument, timestamp, price, price, price, price)
    }

    /// Calculate the bar's range (high - low).
    ///
    /// Feeds occasionally deliver inverted bars, so the absolute value is used.
    #[inline]
    pub fn range(&self) -> f64 {
        (self.high - self.low).abs()
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Calculate the true range (used for ATR).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => {
                let hl = self.range();
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => self.range(),
        }
    }

    /// Whether every price is finite and positive.
    pub fn is_well_formed(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_calculations() {
        let bar = Bar::new("EUR/USD", 1000, 1.1000, 1.1050, 1.0980, 1.1020);

        assert!((bar.range() - 0.0070).abs() < 1e-9);
    }

    #[test]
    fn test_bar_true_range() {
        let bar = Bar::new("EUR/USD", 1000, 100.0, 110.0, 95.0, 105.0);

        // Without previous close
        assert!((bar.true_range(None) - 15.0).abs() < 0.001);

        // With previous close that creates gap
        assert!((bar.true_range(Some(90.0)) - 20.0).abs() < 0.001);
        assert!((bar.true_range(Some(120.0)) - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_inverted_bar_range_is_positive() {
        let bar = Bar::new("EUR/USD", 1000, 1.10, 1.09, 1.11, 1.10);
        assert!(bar.range() > 0.0);
        assert!(bar.true_range(Some(1.10)) >= 0.0);
    }

    #[test]
    fn test_datetime() {
        let bar = Bar::flat("USD/JPY", 1_705_312_800_000, 148.2);
        assert_eq!(bar.datetime().to_rfc3339(), "2024-01-15T10:00:00+00:00");
    }

    #[test]
    fn test_well_formed() {
        assert!(Bar::flat("EUR/USD", 1, 1.1).is_well_formed());
        assert!(!Bar::new("EUR/USD", 1, 1.1, f64::NAN, 1.0, 1.1).is_well_formed());
        assert!(!Bar::flat("EUR/USD", 1, 0.0).is_well_formed());
    }
}
