//! Batch worker: one pooled session, postings processed in order.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, instrument, warn};

use internscout_shared::{Posting, Result, ScrapeConfig};

use crate::browser::SessionFactory;
use crate::fetcher::DescriptionFetcher;
use crate::keywords::KeywordExtractor;
use crate::pool::ResourcePool;

/// What a worker hands back for its batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub worker_id: usize,
    /// Attempted postings, in batch order, each with `keywords` set.
    pub postings: Vec<Posting>,
    /// Ids left untouched because no session could be obtained.
    pub unattempted: Vec<String>,
}

/// Randomized pause before each navigation.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    min: Duration,
    max: Duration,
}

impl Throttle {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// A delay drawn uniformly from `[min, max]`.
    pub fn next_delay(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Shared, cheaply cloneable worker state.
pub struct Worker<F: SessionFactory> {
    pool: Arc<ResourcePool<F>>,
    fetcher: Arc<DescriptionFetcher>,
    extractor: Arc<KeywordExtractor>,
    throttle: Throttle,
    page_load_timeout: Duration,
}

impl<F: SessionFactory> Clone for Worker<F> {
    fn clone(&self) -> Self {
        Self {
            pool: Arc::clone(&self.pool),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            throttle: self.throttle,
            page_load_timeout: self.page_load_timeout,
        }
    }
}

impl<F: SessionFactory> Worker<F> {
    pub fn new(
        pool: Arc<ResourcePool<F>>,
        fetcher: Arc<DescriptionFetcher>,
        extractor: Arc<KeywordExtractor>,
        throttle: Throttle,
        page_load_timeout: Duration,
    ) -> Self {
        Self {
            pool,
            fetcher,
            extractor,
            throttle,
            page_load_timeout,
        }
    }

    pub fn from_config(
        pool: Arc<ResourcePool<F>>,
        extractor: Arc<KeywordExtractor>,
        config: &ScrapeConfig,
    ) -> Self {
        Self::new(
            pool,
            Arc::new(DescriptionFetcher::from_config(config)),
            extractor,
            Throttle::new(config.min_delay, config.max_delay),
            config.page_load_timeout,
        )
    }

    /// Fetch and tag every posting of `batch`, in order.
    ///
    /// Fails only when no session can be acquired for the first item. A
    /// session that fails mid-batch is replaced; if the replacement cannot be
    /// acquired the rest of the batch is reported unattempted.
    #[instrument(skip_all, fields(worker_id = worker_id, batch_len = batch.len()))]
    pub async fn run_batch(
        &self,
        worker_id: usize,
        batch: Vec<Posting>,
        on_scraped: impl Fn(&Posting) + Send,
    ) -> Result<BatchOutcome> {
        let mut handle = self.pool.acquire().await?;
        let mut postings = Vec::with_capacity(batch.len());
        let mut items = batch.into_iter();

        while let Some(mut posting) = items.next() {
            if handle.is_tainted() {
                self.pool.release(handle).await;
                handle = match self.pool.acquire().await {
                    Ok(fresh) => fresh,
                    Err(e) => {
                        let unattempted: Vec<String> = std::iter::once(posting.id)
                            .chain(items.map(|p| p.id))
                            .collect();
                        warn!(
                            error = %e,
                            remaining = unattempted.len(),
                            "could not replace failed session, abandoning rest of batch"
                        );
                        return Ok(BatchOutcome {
                            worker_id,
                            postings,
                            unattempted,
                        });
                    }
                };
            }

            if !posting.url.trim().is_empty() {
                self.throttle.pause().await;
            }

            let description = self
                .fetcher
                .fetch(&posting.url, &mut handle, self.page_load_timeout)
                .await;
            let keywords = description
                .as_deref()
                .map(|text| self.extractor.extract(text))
                .unwrap_or_default();
            debug!(
                id = %posting.id,
                found_description = description.is_some(),
                keywords = keywords.len(),
                "scraped posting"
            );

            posting.keywords = Some(keywords);
            on_scraped(&posting);
            postings.push(posting);
        }

        self.pool.release(handle).await;
        info!(scraped = postings.len(), "batch complete");

        Ok(BatchOutcome {
            worker_id,
            postings,
            unattempted: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Scripted, ScriptedFactory};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn posting(id: &str) -> Posting {
        Posting::from_feed_value(serde_json::json!({
            "id": id,
            "url": format!("https://jobs.example/{id}"),
        }))
        .unwrap()
    }

    fn description_page(text: &str) -> Scripted {
        Scripted::Html(format!(
            r#"<html><body><div class="job-description">{text} {}</div></body></html>"#,
            "details ".repeat(20)
        ))
    }

    fn worker(factory: ScriptedFactory, capacity: usize) -> Worker<ScriptedFactory> {
        let vocabulary: Vec<String> = ["python", "react", "sql"].iter().map(|s| s.to_string()).collect();
        Worker::new(
            Arc::new(ResourcePool::new(factory, capacity)),
            Arc::new(DescriptionFetcher::default()),
            Arc::new(KeywordExtractor::new(&vocabulary, 3000)),
            Throttle::none(),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn processes_batch_in_order_with_one_session() {
        let factory = ScriptedFactory::new([
            ("https://jobs.example/a".to_string(), description_page("Python and SQL")),
            ("https://jobs.example/b".to_string(), description_page("React frontend")),
        ]);
        let worker = worker(factory.clone(), 1);
        let seen = AtomicUsize::new(0);

        let outcome = worker
            .run_batch(0, vec![posting("a"), posting("b")], |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();

        let ids: Vec<&str> = outcome.postings.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(
            outcome.postings[0].keywords,
            Some(["python".to_string(), "sql".to_string()].into())
        );
        assert!(outcome.unattempted.is_empty());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test]
    async fn failed_navigation_yields_empty_keywords_and_fresh_session() {
        let factory = ScriptedFactory::new([
            ("https://jobs.example/a".to_string(), Scripted::Fault),
            ("https://jobs.example/b".to_string(), description_page("Python")),
        ]);
        let worker = worker(factory.clone(), 1);

        let outcome = worker
            .run_batch(0, vec![posting("a"), posting("b")], |_| {})
            .await
            .unwrap();

        assert_eq!(outcome.postings[0].keywords, Some(Default::default()));
        assert!(outcome.postings[1].keywords.as_ref().unwrap().contains("python"));
        assert_eq!(factory.created(), 2);
        assert_eq!(factory.closed(), 1);
    }

    #[tokio::test]
    async fn unreplaceable_session_leaves_rest_unattempted() {
        let factory = ScriptedFactory::new([("https://jobs.example/a".to_string(), Scripted::Timeout)]);
        factory.limit_creates(1);
        let worker = worker(factory.clone(), 1);

        let outcome = worker
            .run_batch(3, vec![posting("a"), posting("b"), posting("c")], |_| {})
            .await
            .unwrap();

        assert_eq!(outcome.worker_id, 3);
        assert_eq!(outcome.postings.len(), 1);
        assert_eq!(outcome.unattempted, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn initial_acquire_failure_fails_batch() {
        let factory = ScriptedFactory::default();
        factory.fail_creates(true);
        let worker = worker(factory, 1);

        assert!(worker.run_batch(0, vec![posting("a")], |_| {}).await.is_err());
    }

    #[test]
    fn throttle_delay_stays_in_range() {
        let throttle = Throttle::new(Duration::from_millis(5), Duration::from_millis(15));
        for _ in 0..100 {
            let delay = throttle.next_delay();
            assert!(delay >= Duration::from_millis(5) && delay <= Duration::from_millis(15));
        }
        assert_eq!(Throttle::none().next_delay(), Duration::ZERO);
    }
}
