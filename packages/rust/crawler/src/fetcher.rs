//! Posting description extraction.
//!
//! A page is loaded through a pooled browser session, then the description is
//! located with a fixed, ordered list of CSS selectors. For each selector the
//! candidate is the longest matching element's visible text:
//!
//! - a candidate longer than `confident_match_length` is returned at once
//! - otherwise the first candidate longer than `min_selector_match_length` wins
//! - with no candidate, the whole body text (capped at `max_description_length`
//!   characters) is used
//!
//! Navigation failures never propagate: they yield `None` and taint the handle
//! so the session is not reused.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use internscout_shared::ScrapeConfig;

use crate::browser::{BrowserSession, NavigationError};
use crate::pool::ResourceHandle;

/// Description selectors, most specific first.
pub const DESCRIPTION_SELECTORS: &[&str] = &[
    // Common job description classes
    ".job-description",
    ".job-details",
    ".description",
    ".job-summary",
    ".position-description",
    ".role-description",
    ".job-content",
    ".job-info",
    ".posting-description",
    ".job-desc",
    ".jobDescription",
    ".job-description-content",
    ".job-posting-description",
    // Ids
    "#job-description",
    "#job-details",
    "#description",
    "#job-summary",
    "#jobDescription",
    "#job-desc",
    "#job-content",
    // Data attributes
    "[data-testid='job-description']",
    "[data-test='job-description']",
    "[data-qa='job-description']",
    "[data-automation='job-description']",
    // Partial class matches
    "div[class*='description']",
    "div[class*='job-desc']",
    "div[class*='posting']",
    "section[class*='description']",
    // Accessibility labels
    "[aria-label*='job description']",
    "[aria-label*='description']",
    // Generic content containers
    "article",
    "main[role='main']",
    ".content",
    "#content",
    ".main-content",
];

/// Elements whose text is never visible.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

static PARSED_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    DESCRIPTION_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Length thresholds for picking a description, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorLimits {
    pub min_match_length: usize,
    pub confident_match_length: usize,
    pub max_description_length: usize,
}

impl Default for SelectorLimits {
    fn default() -> Self {
        Self {
            min_match_length: 100,
            confident_match_length: 500,
            max_description_length: 2000,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DescriptionFetcher {
    limits: SelectorLimits,
}

impl DescriptionFetcher {
    pub fn new(limits: SelectorLimits) -> Self {
        Self { limits }
    }

    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self::new(SelectorLimits {
            min_match_length: config.min_selector_match_length,
            confident_match_length: config.confident_match_length,
            max_description_length: config.max_description_length,
        })
    }

    /// Load `url` in the handle's session and extract its description.
    pub async fn fetch<S: BrowserSession>(
        &self,
        url: &str,
        handle: &mut ResourceHandle<S>,
        timeout: Duration,
    ) -> Option<String> {
        if url.trim().is_empty() {
            debug!("posting has no url, skipping navigation");
            return None;
        }

        match handle.session_mut().navigate(url, timeout).await {
            Ok(html) => self.extract(&html),
            Err(NavigationError::Timeout(limit)) => {
                warn!(url, ?limit, "page load timed out");
                handle.taint();
                None
            }
            Err(NavigationError::Fault(message)) => {
                warn!(url, error = %message, "navigation failed");
                handle.taint();
                None
            }
        }
    }

    /// Pick the description out of a rendered document.
    pub fn extract(&self, html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let limits = &self.limits;
        let mut chosen: Option<String> = None;

        for (selector, name) in PARSED_SELECTORS.iter().zip(DESCRIPTION_SELECTORS) {
            let Some(candidate) = longest_match(&doc, selector) else {
                continue;
            };
            let len = candidate.chars().count();
            if len > limits.confident_match_length {
                debug!(selector = name, len, "confident description match");
                return Some(candidate);
            }
            if len > limits.min_match_length && chosen.is_none() {
                debug!(selector = name, len, "adequate description match");
                chosen = Some(candidate);
            }
        }

        let text = match chosen {
            Some(text) => text,
            None => {
                let body = doc
                    .select(&BODY_SELECTOR)
                    .next()
                    .map(visible_text)
                    .unwrap_or_default();
                truncate_chars(&body, limits.max_description_length)
                    .trim_end()
                    .to_string()
            }
        };

        (!text.is_empty()).then_some(text)
    }
}

/// Longest normalized visible text among the elements matching `selector`.
fn longest_match(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .map(visible_text)
        .filter(|text| !text.is_empty())
        .max_by_key(|text| text.chars().count())
}

/// Text content of `element`, excluding script-like subtrees, whitespace-normalized.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let parts: Vec<&str> = element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
            });
            (!hidden).then_some(&**text)
        })
        .collect();
    normalize_whitespace(&parts.join(" "))
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    WS_RE.replace_all(text.trim(), " ").into_owned()
}

/// The first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
