//! The polling loop.

use crate::report::{InstrumentReport, InstrumentResult, SkipReason, TickReport};
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use forex_core::error::{DataError, IndicatorError, PipelineError};
use forex_core::traits::{DataSource, NewsSource};
use forex_core::types::{Bar, MarketContext, Signal};
use forex_indicators::{IndicatorEngine, IndicatorParams};
use forex_monitor::DeliveryStats;
use forex_signals::{AlertConfig, SignalEvaluator};
use forex_sinks::SinkDispatcher;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Timeout and retry settings for market-data calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    /// Attempts per fetch, first call included
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl FetchPolicy {
    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
            .with_jitter()
    }
}

/// Loop settings.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub instruments: Vec<String>,
    pub poll_interval: Duration,
    /// Bars fetched per instrument before the first tick; 0 disables warm-up
    pub warmup_bars: usize,
    pub fetch: FetchPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            instruments: vec!["EUR/USD".into()],
            poll_interval: Duration::from_secs(900),
            warmup_bars: 60,
            fetch: FetchPolicy::default(),
        }
    }
}

/// Outcome of the per-instrument compute step.
enum Step {
    Ready(Signal),
    Skipped(SkipReason),
}

/// Owns all per-instrument state. Network work runs concurrently, but
/// indicator and evaluator updates happen here, sequentially, between
/// suspension points.
pub struct Pipeline {
    options: PipelineOptions,
    engine: IndicatorEngine,
    evaluator: SignalEvaluator,
    source: Arc<dyn DataSource>,
    news: Arc<dyn NewsSource>,
    dispatcher: SinkDispatcher,
    stats: DeliveryStats,
    ticks: u64,
    /// Set when the provider answers with a rate limit; no fetches before it
    rate_limited_until: Option<Instant>,
}

impl Pipeline {
    pub fn new(
        options: PipelineOptions,
        params: IndicatorParams,
        alerts: AlertConfig,
        source: Arc<dyn DataSource>,
        news: Arc<dyn NewsSource>,
        dispatcher: SinkDispatcher,
    ) -> Result<Self, PipelineError> {
        if options.instruments.is_empty() {
            return Err(PipelineError::Config("no instruments configured".into()));
        }
        let engine = IndicatorEngine::new(params)?;
        let evaluator =
            SignalEvaluator::new(alerts).map_err(|e| PipelineError::Config(e.to_string()))?;

        Ok(Self {
            options,
            engine,
            evaluator,
            source,
            news,
            dispatcher,
            stats: DeliveryStats::new(),
            ticks: 0,
            rate_limited_until: None,
        })
    }

    pub fn instruments(&self) -> &[String] {
        &self.options.instruments
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    pub fn dispatcher(&self) -> &SinkDispatcher {
        &self.dispatcher
    }

    pub fn stats(&self) -> &DeliveryStats {
        &self.stats
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Prime indicators and evaluator state from history without dispatching.
    ///
    /// Returns the number of bars accepted. An instrument whose history
    /// cannot be fetched warms up live instead.
    pub async fn warm_up(&mut self) -> usize {
        let count = self.options.warmup_bars;
        if count == 0 {
            return 0;
        }

        let this: &Self = self;
        let histories = join_all(this.options.instruments.iter().map(|instrument| async move {
            let result = this
                .with_fetch_retry(instrument, || this.source.recent_bars(instrument, count))
                .await;
            (instrument.clone(), result)
        }))
        .await;

        let mut accepted = 0;
        for (instrument, result) in histories {
            let bars = match result {
                Ok(bars) => bars,
                Err(e) => {
                    warn!(
                        instrument = %instrument,
                        error = %e,
                        "Warm-up fetch failed, warming up live"
                    );
                    continue;
                }
            };

            let before = accepted;
            for bar in bars.iter().filter(|b| b.instrument == instrument) {
                match self.engine.update(bar) {
                    Ok(indicators) => {
                        self.evaluator
                            .evaluate(bar, &indicators, &MarketContext::empty());
                        accepted += 1;
                    }
                    Err(e) => debug!(instrument = %instrument, error = %e, "Warm-up bar rejected"),
                }
            }
            info!(
                instrument = %instrument,
                bars = accepted - before,
                warmed_up = self
                    .engine
                    .state(&instrument)
                    .is_some_and(|s| s.bars_seen() >= self.engine.params().warmup_bars()),
                "Warm-up complete"
            );
        }
        accepted
    }

    /// Run one fetch, compute, dispatch cycle.
    pub async fn tick(&mut self) -> TickReport {
        self.ticks += 1;
        let tick = self.ticks;
        let started_at = Utc::now();
        let clock = Instant::now();

        let fetched = match self.rate_limit_remaining() {
            Some(remaining) => {
                info!(
                    retry_in_secs = remaining.as_secs(),
                    "Provider rate limit in effect, skipping fetches"
                );
                let retry_after_secs = remaining.as_secs_f64().ceil() as u64;
                self.options
                    .instruments
                    .iter()
                    .map(|instrument| {
                        let err = DataError::RateLimited { retry_after_secs };
                        (instrument.clone(), Err(err), MarketContext::empty())
                    })
                    .collect()
            }
            None => {
                let fetched = self.fetch_all().await;
                self.note_rate_limit(&fetched);
                fetched
            }
        };

        let mut steps = Vec::with_capacity(fetched.len());
        for (instrument, bar, context) in fetched {
            let step = match bar {
                Ok(bar) => self.compute(&bar, &context),
                Err(e) => {
                    warn!(
                        instrument = %instrument,
                        error = %e,
                        "Fetch failed, skipping instrument"
                    );
                    Step::Skipped(SkipReason::FetchFailed {
                        error: e.to_string(),
                    })
                }
            };
            steps.push((instrument, step));
        }

        let dispatcher = &self.dispatcher;
        let mut outcomes = join_all(steps.iter().filter_map(|(_, step)| match step {
            Step::Ready(signal) => Some(dispatcher.dispatch(signal)),
            Step::Skipped(_) => None,
        }))
        .await
        .into_iter();

        let mut instruments = Vec::with_capacity(steps.len());
        for (instrument, step) in steps {
            let result = match step {
                Step::Ready(signal) => {
                    let outcomes = outcomes.next().unwrap_or_default();
                    self.stats.record(signal.alert_triggered, &outcomes);
                    InstrumentResult::Dispatched { signal, outcomes }
                }
                Step::Skipped(reason) => InstrumentResult::Skipped { reason },
            };
            instruments.push(InstrumentReport { instrument, result });
        }
        self.stats.record_tick();

        let report = TickReport {
            tick,
            started_at,
            elapsed_ms: clock.elapsed().as_millis() as u64,
            instruments,
        };
        log_report(&report);
        report
    }

    /// Warm up, then tick on the poll interval until `shutdown` flips to
    /// true or its sender is dropped.
    ///
    /// Shutdown is only observed between ticks, so a running tick always
    /// finishes its sink writes.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            instruments = ?self.options.instruments,
            sinks = ?self.dispatcher.sink_ids(),
            interval_secs = self.options.poll_interval.as_secs(),
            "Starting pipeline"
        );
        self.warm_up().await;

        let mut interval = tokio::time::interval(self.options.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }
            if *shutdown.borrow() {
                break;
            }
            self.tick().await;
        }

        info!(ticks = self.ticks, "Pipeline stopped");
        self.stats.log_summary();
    }

    fn rate_limit_remaining(&self) -> Option<Duration> {
        self.rate_limited_until
            .map(|until| until.saturating_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Start a provider-wide pause from the longest `retry_after` seen.
    fn note_rate_limit(&mut self, fetched: &[(String, Result<Bar, DataError>, MarketContext)]) {
        let retry_after = fetched
            .iter()
            .filter_map(|(_, bar, _)| match bar {
                Err(DataError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
                _ => None,
            })
            .max();
        if let Some(secs) = retry_after {
            warn!(retry_after_secs = secs, "Provider rate limited, pausing fetches");
            self.rate_limited_until = Some(Instant::now() + Duration::from_secs(secs));
        }
    }

    /// Latest bar and context for every instrument, concurrently.
    async fn fetch_all(&self) -> Vec<(String, Result<Bar, DataError>, MarketContext)> {
        join_all(self.options.instruments.iter().map(|instrument| async move {
            let (bar, context) = tokio::join!(
                self.with_fetch_retry(instrument, || self.source.latest_bar(instrument)),
                self.context(instrument)
            );
            (instrument.clone(), bar, context)
        }))
        .await
    }

    async fn with_fetch_retry<T, F, Fut>(&self, instrument: &str, fetch: F) -> Result<T, DataError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, DataError>>,
    {
        let timeout = self.options.fetch.timeout;
        (|| {
            let request = fetch();
            async move {
                tokio::time::timeout(timeout, request)
                    .await
                    .unwrap_or(Err(DataError::Timeout(timeout)))
            }
        })
        .retry(self.options.fetch.backoff())
        .sleep(tokio::time::sleep)
        // A quota window outlasts any in-tick backoff
        .when(|e: &DataError| e.is_transient() && !matches!(e, DataError::RateLimited { .. }))
        .notify(|err: &DataError, dur: Duration| {
            warn!(
                instrument = %instrument,
                source = self.source.name(),
                error = %err,
                retry_in_ms = dur.as_millis() as u64,
                "Fetch failed, retrying"
            );
        })
        .await
    }

    /// News context; failures and timeouts yield an empty context.
    async fn context(&self, instrument: &str) -> MarketContext {
        let timeout = self.options.fetch.timeout;
        match tokio::time::timeout(timeout, self.news.context(instrument)).await {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                debug!(
                    instrument = %instrument,
                    source = self.news.name(),
                    error = %e,
                    "News unavailable"
                );
                MarketContext::empty()
            }
            Err(_) => {
                debug!(instrument = %instrument, source = self.news.name(), "News timed out");
                MarketContext::empty()
            }
        }
    }

    fn compute(&mut self, bar: &Bar, context: &MarketContext) -> Step {
        match self.engine.update(bar) {
            Ok(indicators) => Step::Ready(self.evaluator.evaluate(bar, &indicators, context)),
            Err(IndicatorError::StaleBar {
                instrument,
                last,
                received,
            }) => {
                debug!(instrument = %instrument, last, received, "Stale bar ignored");
                Step::Skipped(SkipReason::StaleBar { last, received })
            }
            Err(e) => {
                warn!(instrument = %bar.instrument, error = %e, "Malformed bar rejected");
                Step::Skipped(SkipReason::InvalidBar {
                    error: e.to_string(),
                })
            }
        }
    }
}

fn log_report(report: &TickReport) {
    for signal in report.signals().filter(|s| s.alert_triggered) {
        info!(
            instrument = %signal.instrument,
            timestamp = signal.timestamp,
            close = signal.close,
            reasons = %signal.reasons_text(),
            "Alert triggered"
        );
    }
    info!(
        tick = report.tick,
        dispatched = report.dispatched(),
        skipped = report.skipped(),
        alerts = report.alerts(),
        failed_deliveries = report.failed_deliveries(),
        elapsed_ms = report.elapsed_ms,
        "Tick complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forex_core::error::SinkError;
    use forex_core::traits::{Delivery, SignalSink};
    use forex_core::types::{AlertReason, SentimentLabel};
    use forex_signals::ThresholdRule;
    use forex_sinks::{MemorySink, RetryPolicy};
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Hands out queued results per instrument, one per `latest_bar` call.
    #[derive(Default)]
    struct ScriptedSource {
        latest: Mutex<HashMap<String, VecDeque<Result<Bar, DataError>>>>,
        history: Vec<Bar>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn push(self, instrument: &str, result: Result<Bar, DataError>) -> Self {
            self.latest
                .lock()
                .unwrap()
                .entry(instrument.to_string())
                .or_default()
                .push_back(result);
            self
        }

        fn bars(self, instrument: &str, closes: &[(i64, f64)]) -> Self {
            closes.iter().fold(self, |source, &(ts, close)| {
                source.push(instrument, Ok(Bar::flat(instrument, ts, close)))
            })
        }

        fn with_history(mut self, history: Vec<Bar>) -> Self {
            self.history = history;
            self
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        async fn recent_bars(&self, instrument: &str, count: usize) -> Result<Vec<Bar>, DataError> {
            let bars: Vec<Bar> = self
                .history
                .iter()
                .filter(|b| b.instrument == instrument)
                .cloned()
                .collect();
            if bars.is_empty() {
                return Err(DataError::NoDataAvailable(instrument.to_string()));
            }
            Ok(bars[bars.len().saturating_sub(count)..].to_vec())
        }

        async fn latest_bar(&self, instrument: &str) -> Result<Bar, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.latest
                .lock()
                .unwrap()
                .get_mut(instrument)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(DataError::NoDataAvailable(instrument.to_string())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingNews;

    #[async_trait]
    impl NewsSource for FailingNews {
        async fn context(&self, _instrument: &str) -> Result<MarketContext, DataError> {
            Err(DataError::ConnectionError("news down".into()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct LabelNews(SentimentLabel);

    #[async_trait]
    impl NewsSource for LabelNews {
        async fn context(&self, _instrument: &str) -> Result<MarketContext, DataError> {
            Ok(MarketContext {
                headline: Some("ECB holds rates".into()),
                sentiment: Some(self.0),
            })
        }

        fn name(&self) -> &str {
            "label"
        }
    }

    struct Broken;

    #[async_trait]
    impl SignalSink for Broken {
        fn id(&self) -> &str {
            "broken"
        }

        async fn deliver(&self, _signal: &Signal) -> Result<Delivery, SinkError> {
            Err(SinkError::Rejected("always".into()))
        }
    }

    fn fast_options(instruments: &[&str], warmup_bars: usize) -> PipelineOptions {
        PipelineOptions {
            instruments: instruments.iter().map(|s| s.to_string()).collect(),
            poll_interval: Duration::from_millis(10),
            warmup_bars,
            fetch: FetchPolicy {
                timeout: Duration::from_millis(200),
                max_attempts: 3,
                base_delay: Duration::from_millis(1),
            },
        }
    }

    fn fast_dispatch() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    fn pipeline(
        options: PipelineOptions,
        params: IndicatorParams,
        alerts: AlertConfig,
        source: ScriptedSource,
        news: Arc<dyn NewsSource>,
        memory: Arc<MemorySink>,
    ) -> Pipeline {
        let dispatcher = SinkDispatcher::new(fast_dispatch()).with_sink(memory);
        Pipeline::new(options, params, alerts, Arc::new(source), news, dispatcher).unwrap()
    }

    #[tokio::test]
    async fn test_threshold_scenario_alerts_once() {
        let closes = [1.1000, 1.1010, 1.1005, 1.1020, 1.0990];
        let source = ScriptedSource::default().bars(
            "EUR/USD",
            &closes
                .iter()
                .enumerate()
                .map(|(i, &c)| ((i as i64 + 1) * 900_000, c))
                .collect::<Vec<_>>(),
        );
        let params = IndicatorParams {
            ema_fast: 3,
            ..IndicatorParams::default()
        };
        let alerts = AlertConfig {
            thresholds: vec![ThresholdRule::above("EUR/USD", 1.1015)],
            ..AlertConfig::default()
        };
        let memory = Arc::new(MemorySink::new());
        let mut pipeline = pipeline(
            fast_options(&["EUR/USD"], 0),
            params,
            alerts,
            source,
            Arc::new(forex_data::NoNews),
            memory.clone(),
        );

        let mut alert_ticks = Vec::new();
        for _ in 0..closes.len() {
            let report = pipeline.tick().await;
            if report.alerts() > 0 {
                alert_ticks.push(report.tick);
            }
        }

        assert_eq!(alert_ticks, vec![4]);
        let records = memory.records().await;
        assert_eq!(records.len(), 5);
        let alerted: Vec<_> = records.iter().filter(|s| s.alert_triggered).collect();
        assert_eq!(alerted.len(), 1);
        assert_eq!(alerted[0].close, 1.1020);
        assert_eq!(
            alerted[0].alert_reasons,
            vec![AlertReason::PriceAbove { level: 1.1015 }]
        );
        assert_eq!(pipeline.stats().alerts, 1);
    }

    #[tokio::test]
    async fn test_out_of_order_bar_leaves_state_unchanged() {
        let source = ScriptedSource::default().bars(
            "EUR/USD",
            &[(1_000, 1.1000), (2_000, 1.1010), (1_500, 1.2000), (3_000, 1.1005)],
        );
        let memory = Arc::new(MemorySink::new());
        let mut pipeline = pipeline(
            fast_options(&["EUR/USD"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source,
            Arc::new(forex_data::NoNews),
            memory.clone(),
        );

        pipeline.tick().await;
        pipeline.tick().await;
        let before = pipeline.engine().state("EUR/USD").unwrap().clone();

        let report = pipeline.tick().await;
        assert!(matches!(
            report.get("EUR/USD"),
            Some(InstrumentResult::Skipped {
                reason: SkipReason::StaleBar {
                    last: 2_000,
                    received: 1_500
                }
            })
        ));
        let after = pipeline.engine().state("EUR/USD").unwrap();
        assert_eq!(after.bars_seen(), before.bars_seen());
        assert_eq!(after.last_timestamp(), Some(2_000));
        assert_eq!(after.prev_close(), before.prev_close());
        assert_eq!(memory.len().await, 2);

        // The next bar's momentum is measured against 1.1010, not 1.2000
        let report = pipeline.tick().await;
        let signal = report.signals().next().unwrap();
        assert_eq!(signal.timestamp, 3_000);
        assert_eq!(signal.sentiment, SentimentLabel::Bearish);
        assert!(!signal.alert_triggered);
    }

    #[tokio::test]
    async fn test_fetch_failures_are_isolated() {
        let source = ScriptedSource::default()
            .push("USD/XXX", Err(DataError::SymbolNotFound("USD/XXX".into())))
            .bars("EUR/USD", &[(1_000, 1.1)]);
        let memory = Arc::new(MemorySink::new());
        let mut pipeline = pipeline(
            fast_options(&["EUR/USD", "USD/XXX"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source,
            Arc::new(forex_data::NoNews),
            memory.clone(),
        );

        let report = pipeline.tick().await;
        assert_eq!(report.dispatched(), 1);
        assert!(matches!(
            report.get("USD/XXX"),
            Some(InstrumentResult::Skipped {
                reason: SkipReason::FetchFailed { .. }
            })
        ));
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_transient_fetch_error_is_retried() {
        let source = Arc::new(
            ScriptedSource::default()
                .push("EUR/USD", Err(DataError::ConnectionError("reset".into())))
                .bars("EUR/USD", &[(1_000, 1.1)]),
        );
        let memory = Arc::new(MemorySink::new());
        let dispatcher = SinkDispatcher::new(fast_dispatch()).with_sink(memory.clone());
        let mut pipeline = Pipeline::new(
            fast_options(&["EUR/USD"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source.clone(),
            Arc::new(forex_data::NoNews),
            dispatcher,
        )
        .unwrap();

        let report = pipeline.tick().await;
        assert_eq!(report.dispatched(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_fetch_error_is_not_retried() {
        let source = Arc::new(
            ScriptedSource::default()
                .push("EUR/XXX", Err(DataError::SymbolNotFound("EUR/XXX".into()))),
        );
        let dispatcher =
            SinkDispatcher::new(fast_dispatch()).with_sink(Arc::new(MemorySink::new()));
        let mut pipeline = Pipeline::new(
            fast_options(&["EUR/XXX"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source.clone(),
            Arc::new(forex_data::NoNews),
            dispatcher,
        )
        .unwrap();

        let report = pipeline.tick().await;
        assert_eq!(report.skipped(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_pauses_fetching() {
        let source = Arc::new(
            ScriptedSource::default()
                .push("EUR/USD", Err(DataError::RateLimited { retry_after_secs: 60 }))
                .bars("EUR/USD", &[(1_000, 1.1)]),
        );
        let dispatcher =
            SinkDispatcher::new(fast_dispatch()).with_sink(Arc::new(MemorySink::new()));
        let mut pipeline = Pipeline::new(
            fast_options(&["EUR/USD"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source.clone(),
            Arc::new(forex_data::NoNews),
            dispatcher,
        )
        .unwrap();

        let first = pipeline.tick().await;
        assert!(matches!(
            first.get("EUR/USD"),
            Some(InstrumentResult::Skipped {
                reason: SkipReason::FetchFailed { .. }
            })
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let second = pipeline.tick().await;
        assert_eq!(second.skipped(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_rate_limit_resumes_fetching() {
        let source = Arc::new(
            ScriptedSource::default()
                .push("EUR/USD", Err(DataError::RateLimited { retry_after_secs: 0 }))
                .bars("EUR/USD", &[(1_000, 1.1)]),
        );
        let dispatcher =
            SinkDispatcher::new(fast_dispatch()).with_sink(Arc::new(MemorySink::new()));
        let mut pipeline = Pipeline::new(
            fast_options(&["EUR/USD"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source.clone(),
            Arc::new(forex_data::NoNews),
            dispatcher,
        )
        .unwrap();

        assert_eq!(pipeline.tick().await.skipped(), 1);
        assert_eq!(pipeline.tick().await.dispatched(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_news_failure_does_not_block_signal() {
        let source = ScriptedSource::default().bars("EUR/USD", &[(1_000, 1.1)]);
        let memory = Arc::new(MemorySink::new());
        let mut pipeline = pipeline(
            fast_options(&["EUR/USD"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source,
            Arc::new(FailingNews),
            memory.clone(),
        );

        let report = pipeline.tick().await;
        let signal = report.signals().next().unwrap();
        assert!(signal.headline.is_none());
        assert_eq!(signal.news_text(), "No news");
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_external_label_reaches_signal() {
        let source = ScriptedSource::default().bars("EUR/USD", &[(1_000, 1.1)]);
        let memory = Arc::new(MemorySink::new());
        let mut pipeline = pipeline(
            fast_options(&["EUR/USD"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source,
            Arc::new(LabelNews(SentimentLabel::Bearish)),
            memory,
        );

        let report = pipeline.tick().await;
        let signal = report.signals().next().unwrap();
        // No previous close, so momentum is neutral and the label decides
        assert_eq!(signal.sentiment, SentimentLabel::Bearish);
        assert_eq!(signal.headline.as_deref(), Some("ECB holds rates"));
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_others() {
        let source = ScriptedSource::default().bars("EUR/USD", &[(1_000, 1.1)]);
        let memory = Arc::new(MemorySink::new());
        let dispatcher = SinkDispatcher::new(fast_dispatch())
            .with_sink(Arc::new(Broken))
            .with_sink(memory.clone());
        let mut pipeline = Pipeline::new(
            fast_options(&["EUR/USD"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            Arc::new(source),
            Arc::new(forex_data::NoNews),
            dispatcher,
        )
        .unwrap();

        let report = pipeline.tick().await;
        assert_eq!(report.failed_deliveries(), 1);
        assert_eq!(memory.len().await, 1);
        assert_eq!(pipeline.stats().sink("broken").unwrap().failed, 1);
        assert_eq!(pipeline.stats().sink("memory").unwrap().success, 1);
    }

    #[tokio::test]
    async fn test_warm_up_primes_without_dispatch() {
        let history: Vec<Bar> = (0..60)
            .map(|i| Bar::flat("EUR/USD", (i + 1) * 900_000, 1.10 + i as f64 * 0.0001))
            .collect();
        let source = ScriptedSource::default()
            .with_history(history)
            .bars("EUR/USD", &[(61 * 900_000, 1.1070)]);
        let memory = Arc::new(MemorySink::new());
        let mut pipeline = pipeline(
            fast_options(&["EUR/USD", "GBP/USD"], 60),
            IndicatorParams::default(),
            AlertConfig::default(),
            source,
            Arc::new(forex_data::NoNews),
            memory.clone(),
        );

        // GBP/USD has no history and warms up live
        assert_eq!(pipeline.warm_up().await, 60);
        assert!(memory.is_empty().await);
        assert_eq!(pipeline.engine().state("EUR/USD").unwrap().bars_seen(), 60);

        let report = pipeline.tick().await;
        let signal = report.signals().next().unwrap();
        assert!(!signal.provisional);
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let source = ScriptedSource::default().bars("EUR/USD", &[(1_000, 1.1), (2_000, 1.2)]);
        let memory = Arc::new(MemorySink::new());
        let mut pipeline = pipeline(
            fast_options(&["EUR/USD"], 0),
            IndicatorParams::default(),
            AlertConfig::default(),
            source,
            Arc::new(forex_data::NoNews),
            memory,
        );

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = tx.send(true);
        });

        tokio::time::timeout(Duration::from_secs(5), pipeline.run(rx))
            .await
            .unwrap();
        assert!(pipeline.ticks() >= 1);
    }

    #[test]
    fn test_rejects_empty_instruments() {
        let result = Pipeline::new(
            PipelineOptions {
                instruments: Vec::new(),
                ..PipelineOptions::default()
            },
            IndicatorParams::default(),
            AlertConfig::default(),
            Arc::new(ScriptedSource::default()),
            Arc::new(forex_data::NoNews),
            SinkDispatcher::new(RetryPolicy::default()),
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }
}
