//! Assemble a pipeline from validated configuration.

use crate::pipeline::{FetchPolicy, Pipeline, PipelineOptions};
use forex_config::{AppConfig, SourceKind};
use forex_core::error::PipelineError;
use forex_core::traits::{DataSource, NewsSource};
use forex_data::{
    CsvDataSource, HttpNews, HttpNewsConfig, RateLimiter, StaticNews, TwelveDataConfig,
    TwelveDataSource, WeekendAware,
};
use forex_sinks::{
    CsvSheetSink, MemorySink, PostgresSink, RetryPolicy, SinkDispatcher, TelegramConfig,
    TelegramSink,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Build the data source, news source and sinks named by `config`.
///
/// With `dry_run` every configured sink is replaced by an in-memory sink.
/// A configuration with no sinks also falls back to the in-memory sink.
pub fn build_pipeline(config: &AppConfig, dry_run: bool) -> Result<Pipeline, PipelineError> {
    let settings = &config.pipeline;

    let options = PipelineOptions {
        instruments: settings.instruments.clone(),
        poll_interval: settings.poll_interval(),
        warmup_bars: settings.warmup_bars,
        fetch: FetchPolicy {
            timeout: settings.fetch_timeout(),
            max_attempts: settings.max_attempts,
            base_delay: settings.backoff_base(),
        },
    };

    let dispatcher = build_dispatcher(config, dry_run)?;
    Pipeline::new(
        options,
        config.indicator_params(),
        config.alert_config(),
        build_source(config)?,
        build_news(config)?,
        dispatcher,
    )
}

fn build_source(config: &AppConfig) -> Result<Arc<dyn DataSource>, PipelineError> {
    let settings = &config.pipeline;
    match settings.source {
        SourceKind::TwelveData => {
            let provider = &config.provider;
            let api_key = provider
                .api_key
                .clone()
                .ok_or_else(|| PipelineError::Config("provider.api_key is not set".into()))?;
            let source = TwelveDataSource::new(TwelveDataConfig {
                base_url: provider.base_url.clone(),
                interval: provider.interval,
                timeout: settings.fetch_timeout(),
                ..TwelveDataConfig::new(api_key)
            })?
            .with_rate_limiter(Arc::new(RateLimiter::new(provider.requests_per_minute)));
            info!(
                interval = %provider.interval,
                requests_per_minute = provider.requests_per_minute,
                "Using Twelve Data source"
            );
            Ok(Arc::new(source))
        }
        SourceKind::Csv => {
            let dir = settings
                .csv_dir
                .as_deref()
                .ok_or_else(|| PipelineError::Config("pipeline.csv_dir is not set".into()))?;
            let mut source = CsvDataSource::new(dir)?;
            if settings.csv_replay {
                source = source.replay();
            }
            info!(dir = %dir, replay = settings.csv_replay, "Using CSV source");
            Ok(Arc::new(source))
        }
    }
}

/// Label keys are uppercased since configuration keys may come back lowercased.
fn build_news(config: &AppConfig) -> Result<Arc<dyn NewsSource>, PipelineError> {
    let settings = &config.news;
    let news: Arc<dyn NewsSource> = match &settings.calendar_url {
        Some(url) => {
            let mut news = HttpNews::new(HttpNewsConfig {
                sentiment_url: settings.sentiment_url.clone(),
                timeout: config.pipeline.fetch_timeout(),
                ..HttpNewsConfig::new(url.clone())
            })?;
            for (instrument, label) in &settings.sentiment {
                news = news.with_sentiment(instrument.to_uppercase(), label);
            }
            info!(calendar = %url, rating = settings.sentiment_url.is_some(), "Using HTTP news");
            weekend_aware(news, settings.weekend_notice)
        }
        None => {
            let mut news = StaticNews::new(settings.static_headline.clone());
            for (instrument, label) in &settings.sentiment {
                news = news.with_sentiment(instrument.to_uppercase(), label);
            }
            weekend_aware(news, settings.weekend_notice)
        }
    };
    Ok(news)
}

fn weekend_aware<N: NewsSource + 'static>(news: N, enabled: bool) -> Arc<dyn NewsSource> {
    if enabled {
        Arc::new(WeekendAware::new(news))
    } else {
        Arc::new(news)
    }
}

fn build_dispatcher(config: &AppConfig, dry_run: bool) -> Result<SinkDispatcher, PipelineError> {
    let settings = &config.pipeline;
    let mut dispatcher = SinkDispatcher::new(RetryPolicy {
        max_attempts: settings.max_attempts,
        base_delay: settings.backoff_base(),
        timeout: settings.sink_timeout(),
    });

    if dry_run {
        info!("Dry run: signals are kept in memory only");
        dispatcher.add_sink(Arc::new(MemorySink::new()));
        return Ok(dispatcher);
    }

    if let Some(url) = &config.postgres.url {
        dispatcher.add_sink(Arc::new(PostgresSink::new(url.clone())));
    }
    if let Some(path) = &config.sheet.path {
        dispatcher.add_sink(Arc::new(CsvSheetSink::new(path)));
    }
    if let Some((token, chat_id)) = config.telegram.credentials() {
        let mut telegram = TelegramConfig::new(token, chat_id);
        telegram.base_url = config.telegram.base_url.clone();
        telegram.timeout = settings.sink_timeout();
        dispatcher.add_sink(Arc::new(TelegramSink::new(telegram)?));
    }

    if dispatcher.is_empty() {
        warn!("No sinks configured, keeping signals in memory");
        dispatcher.add_sink(Arc::new(MemorySink::new()));
    }
    Ok(dispatcher)
}
