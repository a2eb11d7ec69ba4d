//! Bar interval requested from the market-data provider.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Timeframe for bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    /// 1 minute bars
    #[serde(rename = "1min")]
    Minute1,
    /// 5 minute bars
    #[serde(rename = "5min")]
    Minute5,
    /// 15 minute bars
    #[serde(rename = "15min")]
    #[default]
    Minute15,
    /// 30 minute bars
    #[serde(rename = "30min")]
    Minute30,
    /// 1 hour bars
    #[serde(rename = "1h")]
    Hour1,
    /// 4 hour bars
    #[serde(rename = "4h")]
    Hour4,
    /// Daily bars
    #[serde(rename = "1day")]
    Daily,
}

impl Timeframe {
    /// Get the duration of the timeframe in seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            Timeframe::Minute1 => 60,
            Timeframe::Minute5 => 300,
            Timeframe::Minute15 => 900,
            Timeframe::Minute30 => 1800,
            Timeframe::Hour1 => 3600,
            Timeframe::Hour4 => 14400,
            Timeframe::Daily => 86400,
        }
    }

    /// Get the duration of the timeframe in milliseconds.
    pub fn as_millis(&self) -> u64 {
        self.as_secs() * 1000
    }

    /// Interval name understood by the Twelve Data `time_series` endpoint.
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1min",
            Timeframe::Minute5 => "5min",
            Timeframe::Minute15 => "15min",
            Timeframe::Minute30 => "30min",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1day",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_provider_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1m" | "1min" => Ok(Timeframe::Minute1),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "30m" | "30min" => Ok(Timeframe::Minute30),
            "1h" | "60min" => Ok(Timeframe::Hour1),
            "4h" => Ok(Timeframe::Hour4),
            "1d" | "1day" | "daily" => Ok(Timeframe::Daily),
            _ => Err(format!("Invalid timeframe: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::Minute1.as_secs(), 60);
        assert_eq!(Timeframe::Minute15.as_millis(), 900_000);
        assert_eq!(Timeframe::Daily.as_secs(), 86400);
    }

    #[test]
    fn test_timeframe_parse() {
        assert_eq!(Timeframe::from_str("15min").unwrap(), Timeframe::Minute15);
        assert_eq!(Timeframe::from_str("15m").unwrap(), Timeframe::Minute15);
        assert_eq!(Timeframe::from_str("daily").unwrap(), Timeframe::Daily);
        assert!(Timeframe::from_str("1w").is_err());
    }

    #[test]
    fn test_serde_uses_provider_names() {
        let json = serde_json::to_string(&Timeframe::Hour1).unwrap();
        assert_eq!(json, "\"1h\"");
        let parsed: Timeframe = serde_json::from_str("\"15min\"").unwrap();
        assert_eq!(parsed, Timeframe::Minute15);
    }
}
