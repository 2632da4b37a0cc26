//! Browser-automation sessions.
//!
//! [`BrowserSession`] and [`SessionFactory`] are the seams the pool and the
//! fetcher work against. [`ChromeFactory`] drives a real headless Chromium
//! through the DevTools protocol; tests substitute in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use internscout_shared::{InternScoutError, Result, ScrapeConfig};

/// Why a navigation did not produce a page.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("page load exceeded {0:?}")]
    Timeout(Duration),

    #[error("navigation failed: {0}")]
    Fault(String),
}

/// One live browser session. Used by a single worker at a time.
#[async_trait]
pub trait BrowserSession: Send {
    /// Load `url` and return the rendered document HTML.
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<String, NavigationError>;

    /// Tear the session down. Errors are logged, not returned.
    async fn close(&mut self);
}

/// Creates sessions on demand for the pool.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: BrowserSession + 'static;

    async fn create(&self) -> Result<Self::Session>;
}

// ---------------------------------------------------------------------------
// Chromium
// ---------------------------------------------------------------------------

/// Launches one Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromeFactory {
    headless: bool,
    window_size: (u32, u32),
}

impl ChromeFactory {
    pub fn new(headless: bool, window_size: (u32, u32)) -> Self {
        Self {
            headless,
            window_size,
        }
    }

    pub fn from_config(config: &ScrapeConfig) -> Self {
        Self::new(config.headless, config.window_size)
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let (width, height) = self.window_size;
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(width, height)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-gpu")
            .arg("--disable-extensions");
        if !self.headless {
            builder = builder.with_head();
        }
        builder.build().map_err(InternScoutError::Browser)
    }
}

#[async_trait]
impl SessionFactory for ChromeFactory {
    type Session = ChromeSession;

    async fn create(&self) -> Result<ChromeSession> {
        let (mut browser, mut handler) = Browser::launch(self.browser_config()?)
            .await
            .map_err(|e| InternScoutError::Browser(format!("failed to launch browser: {e}")))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "browser handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                return Err(InternScoutError::Browser(format!("failed to open page: {e}")));
            }
        };

        debug!("browser session created");
        Ok(ChromeSession {
            browser,
            handler,
            page,
        })
    }
}

/// A Chromium process with a single reusable tab.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<String, NavigationError> {
        let page = &self.page;
        let load = async move {
            page.goto(url).await?;
            page.content().await
        };

        match tokio::time::timeout(timeout, load).await {
            Err(_) => Err(NavigationError::Timeout(timeout)),
            Ok(Err(e)) => Err(NavigationError::Fault(e.to_string())),
            Ok(Ok(html)) => Ok(html),
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!(error = %e, "failed to close browser cleanly");
        }
        if let Err(e) = self.browser.wait().await {
            debug!(error = %e, "browser process wait failed");
        }
        self.handler.abort();
    }
}
