//! Run orchestration and reporting for InternScout.
//!
//! This crate ties the feed, the browser pool, and storage together into a
//! resumable run ([`Orchestrator`]), and provides the read-side reports
//! (stats, export, date histogram).

pub mod checkpoint;
pub mod export;
pub mod filter;
pub mod orchestrator;
pub mod partition;
pub mod persist;
pub mod stats;

pub use checkpoint::ProgressStore;
pub use export::export_json;
pub use filter::{DateReport, filter_by_date, remaining};
pub use orchestrator::{Orchestrator, ProgressReporter, RunSummary, SilentProgress};
pub use partition::partition;
pub use persist::{BatchWriteReport, Persister};
pub use stats::{CategoryCounts, KeywordAnalysis, RecentPosting, Stats};
