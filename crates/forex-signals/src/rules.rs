//! Stateless classification rules.

use crate::config::RsiBands;
use forex_core::types::{Crossover, SentimentLabel, Trend};

/// Trend from the EMA pair, neutral until both are warmed up.
pub fn trend(emas: Option<(f64, f64)>) -> Trend {
    match emas {
        Some((fast, slow)) if fast > slow => Trend::Uptrend,
        Some(_) => Trend::Downtrend,
        None => Trend::Neutral,
    }
}

/// Crossover event from the previous and current `fast > slow` relation.
///
/// The first defined relation has nothing to flip from and never fires.
pub fn crossover(prev_above: Option<bool>, above: Option<bool>) -> Option<Crossover> {
    match (prev_above, above) {
        (Some(false), Some(true)) => Some(Crossover::BullishCrossover),
        (Some(true), Some(false)) => Some(Crossover::BearishCrossover),
        _ => None,
    }
}

/// Sentiment implied by price momentum and trend.
///
/// Momentum agreeing with the trend takes that direction, a neutral trend
/// defers to momentum alone, and disagreement or a flat close is neutral.
pub fn momentum_sentiment(close: f64, prev_close: Option<f64>, trend: Trend) -> SentimentLabel {
    let Some(prev) = prev_close else {
        return SentimentLabel::Neutral;
    };
    let direction = if close > prev {
        SentimentLabel::Bullish
    } else if close < prev {
        SentimentLabel::Bearish
    } else {
        return SentimentLabel::Neutral;
    };

    match (direction, trend) {
        (_, Trend::Neutral) => direction,
        (SentimentLabel::Bullish, Trend::Uptrend) | (SentimentLabel::Bearish, Trend::Downtrend) => {
            direction
        }
        _ => SentimentLabel::Neutral,
    }
}

/// Fuse price momentum with an external label.
///
/// Non-neutral momentum always wins; the external label only fills in
/// when momentum is neutral.
pub fn fuse_sentiment(
    momentum: SentimentLabel,
    external: Option<SentimentLabel>,
) -> SentimentLabel {
    match momentum {
        SentimentLabel::Neutral => external.unwrap_or(SentimentLabel::Neutral),
        directional => directional,
    }
}

/// RSI zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiZone {
    /// Classify an RSI value; band edges belong to the extreme zones.
    pub fn classify(rsi: f64, bands: &RsiBands) -> Self {
        if rsi >= bands.overbought {
            RsiZone::Overbought
        } else if rsi <= bands.oversold {
            RsiZone::Oversold
        } else {
            RsiZone::Neutral
        }
    }
}
