//! Economic-calendar and rating adapter over JSON endpoints.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use forex_core::error::DataError;
use forex_core::traits::NewsSource;
use forex_core::types::{MarketContext, SentimentLabel};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Headline when the calendar has nothing relevant today.
pub const NO_MAJOR_NEWS: &str = "No major news";

const MAX_HEADLINES: usize = 3;

/// Endpoints for [`HttpNews`].
#[derive(Debug, Clone)]
pub struct HttpNewsConfig {
    /// Returns a JSON array of calendar events
    pub calendar_url: String,
    /// Returns `{"rating": "..."}` for `?symbol=EUR/USD`
    pub sentiment_url: Option<String>,
    pub timeout: Duration,
}

impl HttpNewsConfig {
    pub fn new(calendar_url: impl Into<String>) -> Self {
        Self {
            calendar_url: calendar_url.into(),
            sentiment_url: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CalendarEvent {
    #[serde(alias = "country")]
    currency: String,
    #[serde(default)]
    impact: String,
    #[serde(alias = "event", alias = "name")]
    title: String,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RatingResponse {
    #[serde(alias = "recommendation", alias = "summary")]
    rating: String,
}

/// Headlines from today's high-impact events for either currency of the
/// pair, and a technical rating from an optional second endpoint.
///
/// Labels set with [`HttpNews::with_sentiment`] are used when the rating
/// endpoint is absent or unavailable.
pub struct HttpNews {
    config: HttpNewsConfig,
    client: Client,
    fallback: HashMap<String, SentimentLabel>,
    clock: fn() -> DateTime<Utc>,
}

impl HttpNews {
    pub fn new(config: HttpNewsConfig) -> Result<Self, DataError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;
        Ok(Self {
            config,
            client,
            fallback: HashMap::new(),
            clock: Utc::now,
        })
    }

    /// Attach a free-text fallback label; unrecognised text is ignored.
    pub fn with_sentiment(mut self, instrument: impl Into<String>, label: &str) -> Self {
        if let Some(parsed) = SentimentLabel::parse_external(label) {
            self.fallback.insert(instrument.into(), parsed);
        }
        self
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, DataError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DataError::Timeout(self.config.timeout)
            } else {
                DataError::ConnectionError(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = format!("{}: {}", status, body.chars().take(200).collect::<String>());
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                DataError::Provider(message)
            } else {
                DataError::Internal(message)
            });
        }

        resp.json()
            .await
            .map_err(|e| DataError::ParseError(e.to_string()))
    }

    async fn headline(&self, instrument: &str) -> Result<String, DataError> {
        let events: Vec<CalendarEvent> = self
            .get_json(self.client.get(&self.config.calendar_url))
            .await?;
        let today = (self.clock)().date_naive();
        Ok(summarize(&events, instrument, today))
    }

    async fn rating(&self, instrument: &str) -> Result<Option<SentimentLabel>, DataError> {
        let Some(url) = &self.config.sentiment_url else {
            return Ok(None);
        };
        let request = self.client.get(url).query(&[("symbol", instrument)]);
        let rating: RatingResponse = self.get_json(request).await?;
        Ok(SentimentLabel::parse_external(&rating.rating))
    }
}

/// Up to three high-impact titles for today, comma separated.
fn summarize(events: &[CalendarEvent], instrument: &str, today: NaiveDate) -> String {
    let (base, quote) = instrument.split_once('/').unwrap_or((instrument, ""));
    let concerns = |currency: &str| {
        let currency = currency.trim();
        currency.eq_ignore_ascii_case(base)
            || (!quote.is_empty() && currency.eq_ignore_ascii_case(quote))
    };

    let headlines: Vec<&str> = events
        .iter()
        .filter(|e| e.impact.trim().eq_ignore_ascii_case("high"))
        .filter(|e| concerns(&e.currency))
        .filter(|e| e.date.as_deref().and_then(event_date).map_or(true, |d| d == today))
        .map(|e| e.title.trim())
        .filter(|title| !title.is_empty())
        .take(MAX_HEADLINES)
        .collect();

    if headlines.is_empty() {
        NO_MAJOR_NEWS.to_string()
    } else {
        headlines.join(", ")
    }
}

/// RFC 3339 timestamps or a leading `YYYY-MM-DD`.
fn event_date(text: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .ok()
        .or_else(|| {
            text.get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        })
}

#[async_trait]
impl NewsSource for HttpNews {
    async fn context(&self, instrument: &str) -> Result<MarketContext, DataError> {
        let (headline, rating) = tokio::join!(self.headline(instrument), self.rating(instrument));

        let fallback = self.fallback.get(instrument).copied();
        let sentiment = match rating {
            Ok(label) => label.or(fallback),
            Err(e) => {
                debug!(instrument, error = %e, "Rating unavailable");
                fallback
            }
        };

        match headline {
            Ok(headline) => Ok(MarketContext {
                headline: Some(headline),
                sentiment,
            }),
            Err(e) if sentiment.is_some() => {
                warn!(instrument, error = %e, "Calendar unavailable");
                Ok(MarketContext {
                    headline: None,
                    sentiment,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "http-news"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn monday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn news(server: &MockServer, with_rating: bool) -> HttpNews {
        let config = HttpNewsConfig {
            sentiment_url: with_rating.then(|| format!("{}/rating", server.uri())),
            ..HttpNewsConfig::new(format!("{}/calendar", server.uri()))
        };
        HttpNews::new(config).unwrap().with_clock(monday)
    }

    async fn mount_calendar(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/calendar"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "currency": "USD",
                    "impact": "High",
                    "title": "Non-Farm Payrolls",
                    "date": "2024-01-15T13:30:00Z"
                },
                {
                    "currency": "USD",
                    "impact": "Low",
                    "title": "Crude Oil Inventories",
                    "date": "2024-01-15T15:30:00Z"
                },
                {
                    "currency": "JPY",
                    "impact": "High",
                    "title": "BoJ Rate Decision",
                    "date": "2024-01-15T03:00:00Z"
                },
                {
                    "currency": "EUR",
                    "impact": "High",
                    "title": "Eurogroup Meeting",
                    "date": "2024-01-14T19:00:00Z"
                },
                {"country": "EUR", "impact": "high", "event": "German CPI", "date": "2024-01-15"},
                {"currency": "EUR", "impact": "High", "title": "ECB Press Conference"},
                {
                    "currency": "USD",
                    "impact": "High",
                    "title": "ISM Services PMI",
                    "date": "2024-01-15T15:00:00Z"
                }
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_headline_filters_pair_and_impact() {
        let server = MockServer::start().await;
        mount_calendar(&server).await;

        let ctx = news(&server, false).context("EUR/USD").await.unwrap();
        assert_eq!(
            ctx.headline.as_deref(),
            Some("Non-Farm Payrolls, German CPI, ECB Press Conference")
        );
        assert_eq!(ctx.sentiment, None);
    }

    #[tokio::test]
    async fn test_quiet_pair_has_no_major_news() {
        let server = MockServer::start().await;
        mount_calendar(&server).await;

        let ctx = news(&server, false).context("AUD/NZD").await.unwrap();
        assert_eq!(ctx.headline.as_deref(), Some(NO_MAJOR_NEWS));
    }

    #[tokio::test]
    async fn test_rating_is_parsed() {
        let server = MockServer::start().await;
        mount_calendar(&server).await;
        Mock::given(method("GET"))
            .and(path("/rating"))
            .and(query_param("symbol", "USD/JPY"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"rating": "Strong Sell"})),
            )
            .mount(&server)
            .await;

        let ctx = news(&server, true)
            .with_sentiment("USD/JPY", "Buy")
            .context("USD/JPY")
            .await
            .unwrap();
        assert_eq!(
            ctx.headline.as_deref(),
            Some("Non-Farm Payrolls, BoJ Rate Decision, ISM Services PMI")
        );
        assert_eq!(ctx.sentiment, Some(SentimentLabel::Bearish));
    }

    #[tokio::test]
    async fn test_unknown_rating_uses_fallback_label() {
        let server = MockServer::start().await;
        mount_calendar(&server).await;
        Mock::given(method("GET"))
            .and(path("/rating"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rating": "N/A"})))
            .mount(&server)
            .await;

        let ctx = news(&server, true)
            .with_sentiment("EUR/USD", "bullish")
            .context("EUR/USD")
            .await
            .unwrap();
        assert_eq!(ctx.sentiment, Some(SentimentLabel::Bullish));
    }

    #[tokio::test]
    async fn test_calendar_outage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendar"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = news(&server, false).context("EUR/USD").await.unwrap_err();
        assert!(matches!(err, DataError::Provider(ref m) if m.contains("503")));

        let ctx = news(&server, false)
            .with_sentiment("EUR/USD", "Sell")
            .context("EUR/USD")
            .await
            .unwrap();
        assert_eq!(ctx.headline, None);
        assert_eq!(ctx.sentiment, Some(SentimentLabel::Bearish));
    }

    #[test]
    fn test_event_date_formats() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15);
        assert_eq!(
            event_date("2024-01-15T23:30:00-02:00"),
            NaiveDate::from_ymd_opt(2024, 1, 16)
        );
        assert_eq!(event_date("2024-01-15 08:30"), day);
        assert_eq!(event_date("Mon"), None);
    }
}
