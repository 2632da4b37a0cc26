//! In-memory browser sessions for tests.
//!
//! [`ScriptedFactory`] hands out sessions that answer navigations from a fixed
//! url → outcome table and count every create, close, and navigation.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use internscout_shared::{InternScoutError, Result};

use crate::browser::{BrowserSession, NavigationError, SessionFactory};

/// What a scripted navigation returns.
#[derive(Debug, Clone)]
pub enum Scripted {
    Html(String),
    Timeout,
    Fault,
}

#[derive(Debug)]
struct Counters {
    created: AtomicUsize,
    closed: AtomicUsize,
    navigations: AtomicUsize,
    max_creates: AtomicUsize,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            created: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            navigations: AtomicUsize::new(0),
            max_creates: AtomicUsize::new(usize::MAX),
        }
    }
}

/// Factory for [`ScriptedSession`]s sharing one page table.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    pages: Arc<HashMap<String, Scripted>>,
    counters: Arc<Counters>,
}

impl ScriptedFactory {
    pub fn new(pages: impl IntoIterator<Item = (String, Scripted)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().collect()),
            counters: Arc::default(),
        }
    }

    /// Make every later `create` fail, or succeed again.
    pub fn fail_creates(&self, fail: bool) {
        let max = if fail { 0 } else { usize::MAX };
        self.counters.max_creates.store(max, Ordering::SeqCst);
    }

    /// Allow `count` successful creates in total; later ones fail.
    pub fn limit_creates(&self, count: usize) {
        self.counters.max_creates.store(count, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.counters.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.counters.navigations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    type Session = ScriptedSession;

    async fn create(&self) -> Result<ScriptedSession> {
        let created = self.counters.created.load(Ordering::SeqCst);
        if created >= self.counters.max_creates.load(Ordering::SeqCst) {
            return Err(InternScoutError::Browser("scripted create failure".into()));
        }
        let id = self.counters.created.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            id,
            pages: Arc::clone(&self.pages),
            counters: Arc::clone(&self.counters),
        })
    }
}

#[derive(Debug)]
pub struct ScriptedSession {
    id: usize,
    pages: Arc<HashMap<String, Scripted>>,
    counters: Arc<Counters>,
}

impl ScriptedSession {
    /// Creation order of this session, starting at 0.
    pub fn id(&self) -> usize {
        self.id
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> std::result::Result<String, NavigationError> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(Scripted::Html(html)) => Ok(html.clone()),
            Some(Scripted::Timeout) => Err(NavigationError::Timeout(timeout)),
            Some(Scripted::Fault) | None => {
                Err(NavigationError::Fault(format!("net::ERR_NAME_NOT_RESOLVED at {url}")))
            }
        }
    }

    async fn close(&mut self) {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
    }
}
