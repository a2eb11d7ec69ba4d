//! Signal types emitted once per accepted bar.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trend direction from the fast/slow EMA relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trend {
    Uptrend,
    Downtrend,
    /// Either EMA is still warming up.
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Trend::Uptrend => "Uptrend",
            Trend::Downtrend => "Downtrend",
            Trend::Neutral => "Neutral",
        };
        f.write_str(s)
    }
}

/// Flip of the fast/slow EMA relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crossover {
    BullishCrossover,
    BearishCrossover,
}

impl Crossover {
    /// Label used by every sink; `None` renders as "No Crossover".
    pub fn label(event: Option<Crossover>) -> &'static str {
        match event {
            Some(Crossover::BullishCrossover) => "Bullish Crossover",
            Some(Crossover::BearishCrossover) => "Bearish Crossover",
            None => "No Crossover",
        }
    }
}

/// Three-valued sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Bullish,
    Bearish,
    Neutral,
}

impl SentimentLabel {
    /// Map free-text provider labels onto the three-valued label.
    ///
    /// Technical-rating wording ("Strong Buy", "Sell") and plain wording
    /// ("bullish") are both accepted. Unknown text such as "N/A" yields `None`.
    pub fn parse_external(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        if lower.contains("buy") || lower.contains("bull") {
            Some(SentimentLabel::Bullish)
        } else if lower.contains("sell") || lower.contains("bear") {
            Some(SentimentLabel::Bearish)
        } else if lower.contains("neutral") {
            Some(SentimentLabel::Neutral)
        } else {
            None
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SentimentLabel::Bullish => "Bullish",
            SentimentLabel::Bearish => "Bearish",
            SentimentLabel::Neutral => "Neutral",
        };
        f.write_str(s)
    }
}

/// Why an alert fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlertReason {
    /// Close moved above a configured level.
    PriceAbove { level: f64 },
    /// Close moved below a configured level.
    PriceBelow { level: f64 },
    /// A crossover event fired on this bar.
    Crossover(Crossover),
    /// RSI entered the overbought band.
    RsiOverbought,
    /// RSI entered the oversold band.
    RsiOversold,
    /// RSI left the overbought or oversold band.
    RsiNeutral,
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertReason::PriceAbove { level } => write!(f, "price crossed above {}", level),
            AlertReason::PriceBelow { level } => write!(f, "price crossed below {}", level),
            AlertReason::Crossover(event) => f.write_str(Crossover::label(Some(*event))),
            AlertReason::RsiOverbought => f.write_str("RSI entered overbought"),
            AlertReason::RsiOversold => f.write_str("RSI entered oversold"),
            AlertReason::RsiNeutral => f.write_str("RSI returned to neutral"),
        }
    }
}

/// Headline and sentiment supplied by a news collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub headline: Option<String>,
    pub sentiment: Option<SentimentLabel>,
}

impl MarketContext {
    /// Context with neither headline nor sentiment.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Finished, immutable signal for one instrument and bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub instrument: String,
    /// Bar timestamp, Unix milliseconds
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub rsi: f64,
    pub atr: f64,
    pub support: f64,
    pub resistance: f64,
    pub trend: Trend,
    pub crossover: Option<Crossover>,
    /// Fused sentiment (price momentum first, external label second)
    pub sentiment: SentimentLabel,
    /// Label reported by the news collaborator, if any
    pub external_sentiment: Option<SentimentLabel>,
    pub headline: Option<String>,
    pub alert_triggered: bool,
    pub alert_reasons: Vec<AlertReason>,
    /// True while any indicator is still warming up
    pub provisional: bool,
}

impl Signal {
    /// Natural key used for idempotent writes.
    pub fn key(&self) -> (&str, i64) {
        (&self.instrument, self.timestamp)
    }

    /// Get the timestamp as a DateTime.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Crossover label as shown to humans.
    pub fn crossover_label(&self) -> &'static str {
        Crossover::label(self.crossover)
    }

    /// Headline or a placeholder.
    pub fn news_text(&self) -> &str {
        self.headline.as_deref().unwrap_or("No news")
    }

    /// Alert reasons joined for display.
    pub fn reasons_text(&self) -> String {
        self.alert_reasons
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_external_sentiment() {
        assert_eq!(
            SentimentLabel::parse_external("Strong Buy"),
            Some(SentimentLabel::Bullish)
        );
        assert_eq!(
            SentimentLabel::parse_external(" sell "),
            Some(SentimentLabel::Bearish)
        );
        assert_eq!(
            SentimentLabel::parse_external("Neutral"),
            Some(SentimentLabel::Neutral)
        );
        assert_eq!(SentimentLabel::parse_external("N/A"), None);
    }

    #[test]
    fn test_crossover_labels() {
        assert_eq!(
            Crossover::label(Some(Crossover::BullishCrossover)),
            "Bullish Crossover"
        );
        assert_eq!(Crossover::label(None), "No Crossover");
    }

    #[test]
    fn test_alert_reason_display() {
        assert_eq!(
            AlertReason::PriceAbove { level: 1.1015 }.to_string(),
            "price crossed above 1.1015"
        );
        assert_eq!(
            AlertReason::Crossover(Crossover::BearishCrossover).to_string(),
            "Bearish Crossover"
        );
    }
}
