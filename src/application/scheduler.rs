//! Periodic trigger with a bounded retry around each run
//!
//! Ticks are not caught up: if a run overruns the interval, missed ticks are
//! skipped. Runs never overlap because each tick awaits its run.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::error::RunFailure;
use crate::application::pipeline::{EtlPipeline, RunReport};
use crate::infrastructure::config::SchedulerConfig;

/// Fixed-delay retry: `max_retries` extra attempts, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before the attempt following `attempt` (1-based), or `None` when
    /// `attempt` was the last one allowed.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        (attempt < self.max_attempts()).then_some(self.delay)
    }
}

impl From<&SchedulerConfig> for RetryPolicy {
    fn from(config: &SchedulerConfig) -> Self {
        Self::new(config.retries, Duration::from_secs(config.retry_delay_secs))
    }
}

/// Totals over the scheduler's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub runs: u64,
    pub failures: u64,
}

pub struct EtlScheduler {
    pipeline: Arc<EtlPipeline>,
    target_count: NonZeroUsize,
    interval: Duration,
    retry: RetryPolicy,
    run_on_start: bool,
}

impl EtlScheduler {
    pub fn new(pipeline: Arc<EtlPipeline>, config: &SchedulerConfig) -> Result<Self> {
        let target_count = NonZeroUsize::new(config.target_count)
            .context("scheduler.target_count must be greater than 0")?;
        anyhow::ensure!(config.interval_secs > 0, "scheduler.interval_secs must be greater than 0");

        Ok(Self {
            pipeline,
            target_count,
            interval: Duration::from_secs(config.interval_secs),
            retry: RetryPolicy::from(config),
            run_on_start: config.run_on_start,
        })
    }

    /// Run the pipeline, retrying failed runs per the retry policy.
    ///
    /// Each attempt is a fresh run with a new id. Cancellation during a retry
    /// delay returns the last failure.
    pub async fn run_with_retry(&self, cancel: &CancellationToken) -> Result<RunReport, RunFailure> {
        let mut attempt = 1;
        loop {
            let failure = match self.pipeline.run(self.target_count).await {
                Ok(report) => return Ok(report),
                Err(failure) => failure,
            };

            let Some(delay) = self.retry.delay_after(attempt) else {
                warn!(
                    "Run {} failed after {} attempt(s), giving up",
                    failure.report.run_id, attempt
                );
                return Err(failure);
            };

            warn!(
                "Attempt {}/{} failed: {}. Retrying in {:?}",
                attempt,
                self.retry.max_attempts(),
                failure.error,
                delay
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    info!("Cancelled while waiting to retry");
                    return Err(failure);
                }
            }
            attempt += 1;
        }
    }

    /// One run with retries for single-shot use.
    ///
    /// Cancellation at any point, including mid-run, is an error: the run
    /// did not reach `Loaded`.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<RunReport> {
        tokio::select! {
            outcome = self.run_with_retry(cancel) => Ok(outcome?),
            _ = cancel.cancelled() => anyhow::bail!("run interrupted before completion"),
        }
    }

    /// Run on every tick until `cancel` fires.
    pub async fn run_forever(&self, cancel: CancellationToken) -> SchedulerSummary {
        let mut summary = SchedulerSummary::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        if !self.run_on_start {
            // The first tick completes immediately
            ticker.tick().await;
        }

        info!(
            "Scheduler started: every {:?}, target {} books, {} retries",
            self.interval, self.target_count, self.retry.max_retries
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancel.cancelled() => break,
            }

            summary.runs += 1;
            match self.run_with_retry(&cancel).await {
                Ok(report) => info!(
                    "Scheduled run {} loaded {} books",
                    report.run_id, report.inserted
                ),
                Err(failure) => {
                    summary.failures += 1;
                    warn!("Scheduled run failed: {}", failure);
                }
            }

            if cancel.is_cancelled() {
                break;
            }
        }

        info!(
            "Scheduler stopped after {} runs ({} failed)",
            summary.runs, summary.failures
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::domain::services::{PageFetch, PageSource};
    use crate::infrastructure::parsing::BookListParser;
    use crate::test_utils::{Listing, RecordingBookRepository, ScriptedPageSource, listing_page};

    fn config(retries: u32) -> SchedulerConfig {
        SchedulerConfig {
            interval_secs: 86_400,
            retries,
            retry_delay_secs: 300,
            target_count: 1,
            run_on_start: true,
        }
    }

    fn scheduler(
        source: ScriptedPageSource,
        repository: &Arc<RecordingBookRepository>,
        config: &SchedulerConfig,
    ) -> EtlScheduler {
        let pipeline = EtlPipeline::from_parts(
            Arc::new(source),
            repository.clone(),
            BookListParser::new().unwrap(),
            20,
        );
        EtlScheduler::new(Arc::new(pipeline), config).unwrap()
    }

    /// Never answers within any test's time budget
    struct StalledPageSource;

    #[async_trait]
    impl PageSource for StalledPageSource {
        async fn fetch_page(&self, _page: u32) -> Result<PageFetch> {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
            Ok(PageFetch::Failed { status: 404 })
        }
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy::new(1, Duration::from_secs(300));
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.delay_after(1), Some(Duration::from_secs(300)));
        assert_eq!(policy.delay_after(2), None);

        let no_retry = RetryPolicy::new(0, Duration::from_secs(300));
        assert_eq!(no_retry.delay_after(1), None);
    }

    #[test]
    fn test_zero_target_is_rejected() {
        let repository = Arc::new(RecordingBookRepository::new());
        let pipeline = EtlPipeline::from_parts(
            Arc::new(ScriptedPageSource::always_failing(500)),
            repository,
            BookListParser::new().unwrap(),
            20,
        );
        let mut bad = config(1);
        bad.target_count = 0;
        assert!(EtlScheduler::new(Arc::new(pipeline), &bad).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_failed_first_attempt() {
        let repository = Arc::new(RecordingBookRepository::new());
        // Responses are served in call order: attempt 1 gets the 503, attempt 2 the listing
        let source = ScriptedPageSource::new(vec![
            PageFetch::Failed { status: 503 },
            PageFetch::Success(listing_page(&[Listing::valid("A")])),
        ]);
        let scheduler = scheduler(source, &repository, &config(1));

        let started = tokio::time::Instant::now();
        let report = scheduler.run_with_retry(&CancellationToken::new()).await.unwrap();

        assert!(report.succeeded());
        assert!(started.elapsed() >= Duration::from_secs(300));
        assert_eq!(repository.ensure_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_returns_failure() {
        let repository = Arc::new(RecordingBookRepository::new());
        let scheduler = scheduler(ScriptedPageSource::always_failing(500), &repository, &config(2));

        let failure = scheduler
            .run_with_retry(&CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(repository.ensure_calls(), 3);
        assert_eq!(failure.report.error.as_deref(), Some("No book data found: nothing to load"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_retry_delay() {
        let repository = Arc::new(RecordingBookRepository::new());
        let scheduler = scheduler(ScriptedPageSource::always_failing(500), &repository, &config(5));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(scheduler.run_with_retry(&cancel).await.is_err());
        assert_eq!(repository.ensure_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_forever_ticks_daily_until_cancelled() {
        let repository = Arc::new(RecordingBookRepository::new());
        let page = PageFetch::Success(listing_page(&[Listing::valid("A")]));
        let scheduler = scheduler(ScriptedPageSource::repeating(page), &repository, &config(1));
        let cancel = CancellationToken::new();

        let stopper = {
            let cancel = cancel.clone();
            async move {
                // Runs at t=0, 1d and 2d
                tokio::time::sleep(Duration::from_secs(86_400 * 2 + 3_600)).await;
                cancel.cancel();
            }
        };

        let (summary, ()) = tokio::join!(scheduler.run_forever(cancel.clone()), stopper);

        assert_eq!(summary, SchedulerSummary { runs: 3, failures: 0 });
        assert_eq!(repository.inserted().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_on_start_false_waits_one_interval() {
        let repository = Arc::new(RecordingBookRepository::new());
        let page = PageFetch::Success(listing_page(&[Listing::valid("A")]));
        let mut cfg = config(0);
        cfg.run_on_start = false;
        let scheduler = scheduler(ScriptedPageSource::repeating(page), &repository, &cfg);
        let cancel = CancellationToken::new();

        let stopper = {
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                cancel.cancel();
            }
        };

        let (summary, ()) = tokio::join!(scheduler.run_forever(cancel.clone()), stopper);

        assert_eq!(summary.runs, 0);
        assert_eq!(repository.ensure_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_returns_report() {
        let repository = Arc::new(RecordingBookRepository::new());
        let source = ScriptedPageSource::new(vec![PageFetch::Success(listing_page(&[Listing::valid("A")]))]);
        let scheduler = scheduler(source, &repository, &config(1));

        let report = scheduler.run_once(&CancellationToken::new()).await.unwrap();

        assert!(report.succeeded());
        assert_eq!(repository.inserted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_interrupted_mid_run_is_an_error() {
        let repository = Arc::new(RecordingBookRepository::new());
        let pipeline = EtlPipeline::from_parts(
            Arc::new(StalledPageSource),
            repository.clone(),
            BookListParser::new().unwrap(),
            20,
        );
        let scheduler = EtlScheduler::new(Arc::new(pipeline), &config(1)).unwrap();
        let cancel = CancellationToken::new();

        let stopper = {
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                cancel.cancel();
            }
        };

        let (outcome, ()) = tokio::join!(scheduler.run_once(&cancel), stopper);

        let err = outcome.unwrap_err();
        assert!(err.to_string().contains("interrupted"));
        assert_eq!(repository.ensure_calls(), 1);
        assert_eq!(repository.insert_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_once_failed_run_keeps_report() {
        let repository = Arc::new(RecordingBookRepository::new());
        let scheduler = scheduler(ScriptedPageSource::always_failing(500), &repository, &config(0));

        let err = scheduler.run_once(&CancellationToken::new()).await.unwrap_err();

        let failure = err.downcast_ref::<RunFailure>().unwrap();
        assert_eq!(failure.report.state, crate::domain::run_state::RunState::Failed);
    }
}
