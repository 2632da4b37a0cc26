//! The resumable crawl run.
//!
//! One run: fetch the feed, keep recent postings, drop the ones already in
//! the checkpoint, split the rest into one batch per worker, and collect the
//! batches as they finish. Each finished batch is persisted first and only
//! then are its persisted ids added to the checkpoint, so a crash between the
//! two steps costs a repeat scrape but never a lost record.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use internscout_crawler::{BatchOutcome, FeedSource, KeywordExtractor, ResourcePool, SessionFactory, Worker};
use internscout_shared::{Posting, ProgressRecord, Result, ScrapeConfig};

use crate::checkpoint::ProgressStore;
use crate::filter::{filter_by_date, remaining};
use crate::partition::partition;
use crate::persist::Persister;

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// Counts for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: Uuid,
    /// Postings decoded from the feed.
    pub fetched: usize,
    /// Postings passing the date cutoff.
    pub eligible: usize,
    /// Eligible postings skipped because the checkpoint already lists them.
    pub already_processed: usize,
    pub dispatched: usize,
    pub persisted: usize,
    /// Postings scraped but not stored.
    pub failed: usize,
    /// Postings never attempted (session loss or failed batch).
    pub unattempted: usize,
    pub failed_batches: usize,
    pub elapsed: Duration,
    /// An interrupt arrived before or during dispatch.
    pub interrupted: bool,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            run_id: Uuid::now_v7(),
            fetched: 0,
            eligible: 0,
            already_processed: 0,
            dispatched: 0,
            persisted: 0,
            failed: 0,
            unattempted: 0,
            failed_batches: 0,
            elapsed: Duration::ZERO,
            interrupted: false,
        }
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called from worker tasks after each posting is scraped.
    fn posting_scraped(&self, id: &str, current: usize, total: usize);
    /// Called after a batch has been persisted and checkpointed.
    fn batch_completed(&self, worker_id: usize, persisted: usize, failed: usize);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn posting_scraped(&self, _id: &str, _current: usize, _total: usize) {}
    fn batch_completed(&self, _worker_id: usize, _persisted: usize, _failed: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

type BatchResult = (usize, usize, Result<BatchOutcome>);

pub struct Orchestrator<F: SessionFactory + Clone> {
    config: ScrapeConfig,
    feed: Arc<dyn FeedSource>,
    factory: F,
    persister: Arc<dyn Persister>,
    progress: ProgressStore,
    extractor: Arc<KeywordExtractor>,
    reporter: Arc<dyn ProgressReporter>,
}

impl<F: SessionFactory + Clone> Orchestrator<F> {
    pub fn new(
        config: ScrapeConfig,
        feed: Arc<dyn FeedSource>,
        factory: F,
        persister: Arc<dyn Persister>,
        progress: ProgressStore,
    ) -> Self {
        let extractor = Arc::new(KeywordExtractor::from_config(&config));
        Self {
            config,
            feed,
            factory,
            persister,
            progress,
            extractor,
            reporter: Arc::new(SilentProgress),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_extractor(mut self, extractor: KeywordExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Forget all progress; the next run starts from scratch.
    pub fn reset(&self) -> Result<()> {
        self.progress.reset()
    }

    /// Execute one run.
    ///
    /// Fails on an invalid config, when the feed is unavailable (nothing is
    /// touched) or when the checkpoint cannot be written. An interrupt before
    /// dispatch stops the run with nothing scraped. Once batches are dispatched,
    /// cancelling `interrupt` does not abort them; their results are still
    /// collected.
    #[instrument(skip_all, fields(workers = self.config.worker_count))]
    pub async fn run(&self, interrupt: &CancellationToken) -> Result<RunSummary> {
        self.config.validate()?;
        let start = Instant::now();
        let mut summary = RunSummary::new();
        info!(run_id = %summary.run_id, "starting run");

        self.reporter.phase("Fetching feed");
        let postings = self.feed.fetch_postings().await?;
        summary.fetched = postings.len();

        let eligible = filter_by_date(postings, self.config.date_cutoff_timestamp);
        summary.eligible = eligible.len();

        let mut record = self.progress.load()?;
        let (todo, skipped) = remaining(eligible, &record);
        summary.already_processed = skipped;

        info!(
            fetched = summary.fetched,
            eligible = summary.eligible,
            already_processed = skipped,
            remaining = todo.len(),
            "work planned"
        );

        if interrupt.is_cancelled() {
            warn!(remaining = todo.len(), "interrupted before dispatch");
            summary.interrupted = true;
        } else if !todo.is_empty() {
            summary.dispatched = todo.len();
            self.reporter.phase("Scraping postings");
            let pool = Arc::new(ResourcePool::new(
                self.factory.clone(),
                self.config.worker_count,
            ));
            let result = self
                .dispatch(&pool, todo, &mut record, &mut summary, interrupt)
                .await;
            pool.shutdown().await;
            result?;
        }

        summary.elapsed = start.elapsed();
        info!(
            persisted = summary.persisted,
            failed = summary.failed,
            unattempted = summary.unattempted,
            interrupted = summary.interrupted,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "run complete"
        );
        self.reporter.done(&summary);
        Ok(summary)
    }

    async fn dispatch(
        &self,
        pool: &Arc<ResourcePool<F>>,
        todo: Vec<Posting>,
        record: &mut ProgressRecord,
        summary: &mut RunSummary,
        interrupt: &CancellationToken,
    ) -> Result<()> {
        let total = todo.len();
        let scraped = Arc::new(AtomicUsize::new(0));
        let worker = Worker::from_config(Arc::clone(pool), Arc::clone(&self.extractor), &self.config);

        let mut tasks: JoinSet<BatchResult> = JoinSet::new();
        for (worker_id, batch) in partition(todo, self.config.worker_count).into_iter().enumerate() {
            let worker = worker.clone();
            let reporter = Arc::clone(&self.reporter);
            let scraped = Arc::clone(&scraped);
            tasks.spawn(async move {
                let len = batch.len();
                let outcome = worker
                    .run_batch(worker_id, batch, move |posting| {
                        let current = scraped.fetch_add(1, Ordering::Relaxed) + 1;
                        reporter.posting_scraped(&posting.id, current, total);
                    })
                    .await;
                (worker_id, len, outcome)
            });
        }

        loop {
            tokio::select! {
                _ = interrupt.cancelled(), if !summary.interrupted => {
                    summary.interrupted = true;
                    warn!(in_flight = tasks.len(), "interrupt received, waiting for in-flight batches");
                    self.reporter.phase("Interrupted, finishing in-flight batches");
                }
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((_, _, Ok(outcome))) => self.collect(outcome, record, summary).await?,
                        Ok((worker_id, len, Err(e))) => {
                            warn!(worker_id, error = %e, "batch failed before any posting was attempted");
                            summary.failed_batches += 1;
                            summary.unattempted += len;
                        }
                        Err(e) => {
                            warn!(error = %e, "worker task aborted");
                            summary.failed_batches += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Persist a finished batch, then checkpoint what was stored.
    async fn collect(
        &self,
        outcome: BatchOutcome,
        record: &mut ProgressRecord,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let report = self.persister.upsert_batch(&outcome.postings).await;
        summary.persisted += report.persisted.len();
        summary.failed += report.failed.len();
        summary.unattempted += outcome.unattempted.len();

        if !report.persisted.is_empty() {
            self.progress.record(record, report.persisted.iter().cloned())?;
        }

        info!(
            worker_id = outcome.worker_id,
            persisted = report.persisted.len(),
            failed = report.failed.len(),
            unattempted = outcome.unattempted.len(),
            checkpointed = record.processed_ids.len(),
            "batch collected"
        );
        self.reporter
            .batch_completed(outcome.worker_id, report.persisted.len(), report.failed.len());
        Ok(())
    }
}
