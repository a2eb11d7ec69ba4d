//! Stateful signal evaluator.

use crate::config::{AlertConfig, InvalidAlertConfig};
use crate::rules::{self, RsiZone};
use forex_core::types::{AlertReason, Bar, Indicators, MarketContext, Signal};
use forex_indicators::PriceChannel;
use std::collections::HashMap;
use tracing::debug;

/// What the evaluator remembers about an instrument between bars.
#[derive(Debug, Clone, PartialEq)]
struct PriorState {
    channel: PriceChannel,
    prev_close: Option<f64>,
    /// `ema_fast > ema_slow` on the last bar where both were ready
    prev_above: Option<bool>,
    /// Zone of the last ready RSI
    prev_zone: Option<RsiZone>,
}

impl PriorState {
    fn new(lookback: usize) -> Self {
        Self {
            channel: PriceChannel::new(lookback),
            prev_close: None,
            prev_above: None,
            prev_zone: None,
        }
    }
}

/// Derives trend, crossover, levels, sentiment and alerts per instrument.
///
/// Every alert condition is edge-triggered: a condition that already held
/// on the previous bar does not fire again.
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    config: AlertConfig,
    prior: HashMap<String, PriorState>,
}

impl SignalEvaluator {
    pub fn new(config: AlertConfig) -> Result<Self, InvalidAlertConfig> {
        config.validate()?;
        Ok(Self {
            config,
            prior: HashMap::new(),
        })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Build the signal for an accepted bar and advance the instrument's
    /// prior state.
    ///
    /// Bars must already have passed the indicator engine's ordering check.
    pub fn evaluate(
        &mut self,
        bar: &Bar,
        indicators: &Indicators,
        context: &MarketContext,
    ) -> Signal {
        let lookback = self.config.levels_lookback;
        let prior = self
            .prior
            .entry(bar.instrument.clone())
            .or_insert_with(|| PriorState::new(lookback));

        let levels = prior.channel.update(bar);
        let emas = indicators.emas();
        let trend = rules::trend(emas);

        let above = emas.map(|(fast, slow)| fast > slow);
        let crossover = rules::crossover(prior.prev_above, above);

        let momentum = rules::momentum_sentiment(bar.close, prior.prev_close, trend);
        let sentiment = rules::fuse_sentiment(momentum, context.sentiment);

        let mut reasons = Vec::new();

        if let Some(prev_close) = prior.prev_close {
            for rule in self.config.thresholds_for(&bar.instrument) {
                if let Some(level) = rule.above {
                    if prev_close <= level && bar.close > level {
                        reasons.push(AlertReason::PriceAbove { level });
                    }
                }
                if let Some(level) = rule.below {
                    if prev_close >= level && bar.close < level {
                        reasons.push(AlertReason::PriceBelow { level });
                    }
                }
            }
        }

        if let Some(event) = crossover {
            reasons.push(AlertReason::Crossover(event));
        }

        let zone = indicators
            .rsi
            .ready_value()
            .map(|rsi| RsiZone::classify(rsi, &self.config.rsi_bands));
        if let (Some(prev), Some(zone)) = (prior.prev_zone, zone) {
            if prev != zone {
                reasons.push(match zone {
                    RsiZone::Overbought => AlertReason::RsiOverbought,
                    RsiZone::Oversold => AlertReason::RsiOversold,
                    RsiZone::Neutral => AlertReason::RsiNeutral,
                });
            }
        }

        prior.prev_close = Some(bar.close);
        if above.is_some() {
            prior.prev_above = above;
        }
        if zone.is_some() {
            prior.prev_zone = zone;
        }

        let alert_triggered = !reasons.is_empty();
        if alert_triggered {
            debug!(
                instrument = %bar.instrument,
                timestamp = bar.timestamp,
                reasons = ?reasons,
                "Alert conditions met"
            );
        }

        Signal {
            instrument: bar.instrument.clone(),
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            ema_fast: indicators.ema_fast.value,
            ema_slow: indicators.ema_slow.value,
            rsi: indicators.rsi.value,
            atr: indicators.atr.value,
            support: levels.support,
            resistance: levels.resistance,
            trend,
            crossover,
            sentiment,
            external_sentiment: context.sentiment,
            headline: context.headline.clone(),
            alert_triggered,
            alert_reasons: reasons,
            provisional: !indicators.is_warmed_up(),
        }
    }
}
