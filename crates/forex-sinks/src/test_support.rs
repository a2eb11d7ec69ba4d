use forex_core::types::{AlertReason, SentimentLabel, Signal, Trend};

pub(crate) fn sample_signal(ts: i64) -> Signal {
    Signal {
        instrument: "EUR/USD".into(),
        timestamp: ts,
        open: 1.1000,
        high: 1.1025,
        low: 1.0995,
        close: 1.1020,
        ema_fast: 1.1010,
        ema_slow: 1.1000,
        rsi: 62.5,
        atr: 0.0012,
        support: 1.0980,
        resistance: 1.1030,
        trend: Trend::Uptrend,
        crossover: None,
        sentiment: SentimentLabel::Bullish,
        external_sentiment: None,
        headline: None,
        alert_triggered: true,
        alert_reasons: vec![AlertReason::PriceAbove { level: 1.1015 }],
        provisional: false,
    }
}
