//! Write side of the run: storing enriched postings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;

use internscout_shared::{Posting, Result};
use internscout_storage::Storage;

/// Result of writing one batch. Every input id lands in exactly one list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteReport {
    pub persisted: Vec<String>,
    /// `(id, error message)`
    pub failed: Vec<(String, String)>,
}

/// Idempotent sink for enriched postings.
#[async_trait]
pub trait Persister: Send + Sync {
    /// Insert or overwrite one posting; returns its new `scraped_at`.
    async fn upsert(&self, posting: &Posting) -> Result<DateTime<Utc>>;

    /// Write each posting independently; one failure does not stop the rest.
    async fn upsert_batch(&self, postings: &[Posting]) -> BatchWriteReport {
        let mut report = BatchWriteReport::default();
        for posting in postings {
            match self.upsert(posting).await {
                Ok(_) => report.persisted.push(posting.id.clone()),
                Err(e) => {
                    warn!(id = %posting.id, error = %e, "failed to persist posting");
                    report.failed.push((posting.id.clone(), e.to_string()));
                }
            }
        }
        report
    }
}

#[async_trait]
impl Persister for Storage {
    async fn upsert(&self, posting: &Posting) -> Result<DateTime<Utc>> {
        self.upsert_posting(posting).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn storage_batch_reports_every_id() {
        let path = std::env::temp_dir().join(format!("is_persist_{}.db", Uuid::now_v7()));
        let storage = Storage::open(&path).await.unwrap();

        let postings: Vec<Posting> = ["a", "b"]
            .iter()
            .map(|id| Posting::from_feed_value(json!({"id": id})).unwrap())
            .collect();

        let report = storage.upsert_batch(&postings).await;
        assert_eq!(report.persisted, vec!["a", "b"]);
        assert!(report.failed.is_empty());

        // Re-writing the same batch is safe.
        let again = storage.upsert_batch(&postings).await;
        assert_eq!(again.persisted.len(), 2);
        assert_eq!(storage.count_postings().await.unwrap(), 2);
    }
}
