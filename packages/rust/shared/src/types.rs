//! Core domain types: postings and the progress checkpoint.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Posting
// ---------------------------------------------------------------------------

/// One crawlable listing from the feed, enriched with keywords once scraped.
///
/// Field names follow the feed's JSON keys so a feed record decodes directly
/// into a `Posting`; the complete original record is kept in [`Posting::raw`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    /// Stable external identifier (primary key across runs).
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Locations in feed order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub locations: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub season: String,
    /// Visa sponsorship status as reported by the feed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sponsorship: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,
    #[serde(rename = "is_visible", default, deserialize_with = "null_as_default")]
    pub visible: bool,
    /// Epoch seconds; 0 when the feed omits it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_posted: i64,
    /// Epoch seconds; 0 when the feed omits it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_updated: i64,
    /// The untouched feed record.
    #[serde(default)]
    pub raw: serde_json::Value,
    /// `None` = extraction never attempted, `Some(empty)` = attempted, nothing matched.
    #[serde(default)]
    pub keywords: Option<BTreeSet<String>>,
    /// Set by storage on every successful write.
    #[serde(default)]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl Posting {
    /// The most recent of `date_posted` and `date_updated`.
    pub fn latest_timestamp(&self) -> i64 {
        self.date_posted.max(self.date_updated)
    }

    /// Decode a single feed record, keeping the full record as `raw`.
    pub fn from_feed_value(value: serde_json::Value) -> serde_json::Result<Self> {
        let mut posting: Posting = serde_json::from_value(value.clone())?;
        posting.raw = value;
        posting.keywords = None;
        posting.scraped_at = None;
        Ok(posting)
    }
}

/// Treat an explicit JSON `null` the same as a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// ProgressRecord
// ---------------------------------------------------------------------------

/// Checkpoint state: which postings are fully processed, and when we last ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Ids persisted by a previous batch. Sorted for a stable file layout.
    #[serde(default)]
    pub processed_ids: BTreeSet<String>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn is_processed(&self, id: &str) -> bool {
        self.processed_ids.contains(id)
    }
}
