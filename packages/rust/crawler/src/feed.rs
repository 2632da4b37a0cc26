//! Posting feed access.
//!
//! The feed is a single JSON endpoint returning an array of posting records.
//! Any transport, status, or top-level decode failure is reported as
//! [`InternScoutError::FeedUnavailable`]; individual records that fail to
//! decode are skipped.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

use internscout_shared::{InternScoutError, Posting, Result};

/// User-Agent string for feed requests.
const USER_AGENT: &str = concat!("InternScout/", env!("CARGO_PKG_VERSION"));

/// Source of the current posting snapshot.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_postings(&self) -> Result<Vec<Posting>>;
}

/// [`FeedSource`] backed by an HTTP JSON endpoint.
pub struct HttpFeed {
    client: Client,
    url: String,
}

impl HttpFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                InternScoutError::FeedUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeed {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn fetch_postings(&self) -> Result<Vec<Posting>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| InternScoutError::FeedUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(InternScoutError::FeedUnavailable(format!("HTTP {status}")));
        }

        let records: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| InternScoutError::FeedUnavailable(format!("invalid feed body: {e}")))?;

        let total = records.len();
        let postings = decode_records(records);
        info!(total, decoded = postings.len(), "fetched feed");
        Ok(postings)
    }
}

/// Decode feed records, skipping the ones that are not valid postings.
pub fn decode_records(records: Vec<serde_json::Value>) -> Vec<Posting> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match Posting::from_feed_value(record) {
            Ok(posting) => Some(posting),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed feed record");
                None
            }
        })
        .inspect(|posting| debug!(id = %posting.id, "decoded posting"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn feed_for(server: &MockServer) -> HttpFeed {
        HttpFeed::new(format!("{}/api/intern", server.uri()), Duration::from_secs(5))
            .expect("client")
    }

    #[tokio::test]
    async fn fetches_and_decodes_postings() {
        let server = MockServer::start().await;
        let body = json!([
            {"id": "a", "company_name": "Acme", "title": "SWE Intern",
             "locations": ["NYC"], "date_posted": 10, "date_updated": 20},
            {"id": "b", "company_name": "Globex", "title": "Data Intern"}
        ]);
        Mock::given(method("GET"))
            .and(path("/api/intern"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let postings = feed_for(&server).fetch_postings().await.expect("fetch");
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].id, "a");
        assert_eq!(postings[0].latest_timestamp(), 20);
        assert_eq!(postings[1].date_posted, 0);
    }

    #[tokio::test]
    async fn malformed_records_are_skipped() {
        let server = MockServer::start().await;
        let body = json!([{"title": "missing id"}, {"id": "ok"}, "not an object"]);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let postings = feed_for(&server).fetch_postings().await.expect("fetch");
        let ids: Vec<&str> = postings.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[tokio::test]
    async fn server_error_is_feed_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = feed_for(&server).fetch_postings().await.unwrap_err();
        assert!(matches!(err, InternScoutError::FeedUnavailable(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn non_array_body_is_feed_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let err = feed_for(&server).fetch_postings().await.unwrap_err();
        assert!(matches!(err, InternScoutError::FeedUnavailable(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_feed_unavailable() {
        let feed = HttpFeed::new("http://127.0.0.1:9/feed", Duration::from_secs(1)).unwrap();
        let err = feed.fetch_postings().await.unwrap_err();
        assert!(matches!(err, InternScoutError::FeedUnavailable(_)));
    }
}
