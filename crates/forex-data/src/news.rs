//! News and sentiment adapters.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc, Weekday};
use forex_core::error::DataError;
use forex_core::traits::NewsSource;
use forex_core::types::{MarketContext, SentimentLabel};
use std::collections::HashMap;

/// Headline reported on Saturdays and Sundays.
pub const WEEKEND_NOTICE: &str = "Weekend: No scheduled news.";

/// Reports no headline and no sentiment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNews;

#[async_trait]
impl NewsSource for NoNews {
    async fn context(&self, _instrument: &str) -> Result<MarketContext, DataError> {
        Ok(MarketContext::empty())
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Fixed headline, plus optional per-instrument sentiment labels.
#[derive(Debug, Clone, Default)]
pub struct StaticNews {
    headline: Option<String>,
    sentiment: HashMap<String, SentimentLabel>,
}

impl StaticNews {
    pub fn new(headline: Option<String>) -> Self {
        Self {
            headline: headline.filter(|h| !h.trim().is_empty()),
            sentiment: HashMap::new(),
        }
    }

    /// Attach a free-text sentiment label; unrecognised text is ignored.
    pub fn with_sentiment(mut self, instrument: impl Into<String>, label: &str) -> Self {
        if let Some(parsed) = SentimentLabel::parse_external(label) {
            self.sentiment.insert(instrument.into(), parsed);
        }
        self
    }
}

#[async_trait]
impl NewsSource for StaticNews {
    async fn context(&self, instrument: &str) -> Result<MarketContext, DataError> {
        Ok(MarketContext {
            headline: self.headline.clone(),
            sentiment: self.sentiment.get(instrument).copied(),
        })
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Replaces the inner headline with [`WEEKEND_NOTICE`] on weekends (UTC).
pub struct WeekendAware<N> {
    inner: N,
    clock: fn() -> DateTime<Utc>,
}

impl<N: NewsSource> WeekendAware<N> {
    pub fn new(inner: N) -> Self {
        Self {
            inner,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    fn with_clock(inner: N, clock: fn() -> DateTime<Utc>) -> Self {
        Self { inner, clock }
    }

    fn is_weekend(now: DateTime<Utc>) -> bool {
        matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

#[async_trait]
impl<N: NewsSource> NewsSource for WeekendAware<N> {
    async fn context(&self, instrument: &str) -> Result<MarketContext, DataError> {
        if Self::is_weekend((self.clock)()) {
            // Sentiment still comes from the inner source
            let sentiment = self
                .inner
                .context(instrument)
                .await
                .ok()
                .and_then(|c| c.sentiment);
            return Ok(MarketContext {
                headline: Some(WEEKEND_NOTICE.to_string()),
                sentiment,
            });
        }
        self.inner.context(instrument).await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn saturday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 13, 12, 0, 0).unwrap()
    }

    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_no_news_is_empty() {
        assert_eq!(NoNews.context("EUR/USD").await.unwrap(), MarketContext::empty());
    }

    #[tokio::test]
    async fn test_static_news() {
        let news = StaticNews::new(Some("CPI at 14:30".into()))
            .with_sentiment("EUR/USD", "Strong Sell")
            .with_sentiment("GBP/USD", "N/A");

        let eur = news.context("EUR/USD").await.unwrap();
        assert_eq!(eur.headline.as_deref(), Some("CPI at 14:30"));
        assert_eq!(eur.sentiment, Some(SentimentLabel::Bearish));
        assert_eq!(news.context("GBP/USD").await.unwrap().sentiment, None);
    }

    #[tokio::test]
    async fn test_weekend_notice() {
        let inner = StaticNews::new(Some("NFP release".into())).with_sentiment("EUR/USD", "Buy");

        let weekend = WeekendAware::with_clock(inner.clone(), saturday);
        let ctx = weekend.context("EUR/USD").await.unwrap();
        assert_eq!(ctx.headline.as_deref(), Some(WEEKEND_NOTICE));
        assert_eq!(ctx.sentiment, Some(SentimentLabel::Bullish));

        let weekday = WeekendAware::with_clock(inner, monday);
        let ctx = weekday.context("EUR/USD").await.unwrap();
        assert_eq!(ctx.headline.as_deref(), Some("NFP release"));
    }
}
