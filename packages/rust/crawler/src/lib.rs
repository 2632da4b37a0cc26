//! Feed access, browser sessions, and per-posting extraction.
//!
//! This crate provides:
//! - [`feed`] — the posting feed ([`FeedSource`], [`HttpFeed`])
//! - [`browser`] — browser session seams and the Chromium implementation
//! - [`pool`] — bounded [`ResourcePool`] of sessions with taint disposal
//! - [`fetcher`] — description extraction via ordered selector fallback
//! - [`keywords`] — vocabulary tagging ([`KeywordExtractor`])
//! - [`worker`] — sequential batch processing over one pooled session

pub mod browser;
pub mod feed;
pub mod fetcher;
pub mod keywords;
pub mod pool;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod worker;

pub use browser::{BrowserSession, ChromeFactory, ChromeSession, NavigationError, SessionFactory};
pub use feed::{FeedSource, HttpFeed};
pub use fetcher::{DESCRIPTION_SELECTORS, DescriptionFetcher, SelectorLimits};
pub use keywords::{KeywordExtractor, MinedSpan, PhraseMiner, SpanKind};
pub use pool::{ResourceHandle, ResourcePool};
pub use worker::{BatchOutcome, Throttle, Worker};
