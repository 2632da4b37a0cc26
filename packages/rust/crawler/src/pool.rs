//! Bounded pool of browser sessions.
//!
//! Sessions are created lazily up to the pool capacity and reused across
//! batches. A handle marked tainted (its session saw a navigation failure) is
//! destroyed on release instead of going back to the idle list. After
//! [`ResourcePool::shutdown`] no handle can be acquired and every session
//! still checked out is destroyed when it is released.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

use internscout_shared::{InternScoutError, Result};

use crate::browser::{BrowserSession, SessionFactory};

/// Exclusive use of one pooled session.
pub struct ResourceHandle<S> {
    session: S,
    tainted: bool,
    _permit: OwnedSemaphorePermit,
}

impl<S> ResourceHandle<S> {
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Mark the session unfit for reuse.
    pub fn taint(&mut self) {
        self.tainted = true;
    }

    pub fn is_tainted(&self) -> bool {
        self.tainted
    }
}

pub struct ResourcePool<F: SessionFactory> {
    factory: F,
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<F::Session>>,
    shut_down: AtomicBool,
    capacity: usize,
}

impl<F: SessionFactory> ResourcePool<F> {
    pub fn new(factory: F, capacity: usize) -> Self {
        Self {
            factory,
            permits: Arc::new(Semaphore::new(capacity)),
            idle: Mutex::new(Vec::with_capacity(capacity)),
            shut_down: AtomicBool::new(false),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for a free slot, then hand out an idle session or create one.
    pub async fn acquire(&self) -> Result<ResourceHandle<F::Session>> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| InternScoutError::Browser("resource pool is shut down".into()))?;

        let reused = self.idle.lock().await.pop();
        let session = match reused {
            Some(session) => {
                debug!("reusing idle browser session");
                session
            }
            // On failure the permit drops here and the slot frees up.
            None => self.factory.create().await?,
        };

        Ok(ResourceHandle {
            session,
            tainted: false,
            _permit: permit,
        })
    }

    /// Return a handle. Clean sessions go idle; tainted ones are destroyed.
    pub async fn release(&self, handle: ResourceHandle<F::Session>) {
        let ResourceHandle {
            mut session,
            tainted,
            _permit,
        } = handle;

        {
            let mut idle = self.idle.lock().await;
            if !tainted && !self.shut_down.load(Ordering::Acquire) {
                idle.push(session);
                return;
            }
        }

        debug!(tainted, "destroying browser session");
        session.close().await;
    }

    /// Destroy idle sessions and refuse further acquires.
    pub async fn shutdown(&self) {
        let sessions = {
            let mut idle = self.idle.lock().await;
            self.shut_down.store(true, Ordering::Release);
            self.permits.close();
            std::mem::take(&mut *idle)
        };

        debug!(count = sessions.len(), "closing idle browser sessions");
        for mut session in sessions {
            session.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedFactory;

    #[tokio::test]
    async fn clean_sessions_are_reused() {
        let factory = ScriptedFactory::default();
        let pool = ResourcePool::new(factory.clone(), 2);

        let mut first = pool.acquire().await.unwrap();
        let id = first.session_mut().id();
        pool.release(first).await;

        let mut second = pool.acquire().await.unwrap();
        assert_eq!(second.session_mut().id(), id);
        assert_eq!(factory.created(), 1);
        pool.release(second).await;
    }

    #[tokio::test]
    async fn tainted_sessions_are_destroyed() {
        let factory = ScriptedFactory::default();
        let pool = ResourcePool::new(factory.clone(), 1);

        let mut handle = pool.acquire().await.unwrap();
        handle.taint();
        assert!(handle.is_tainted());
        pool.release(handle).await;
        assert_eq!(factory.closed(), 1);

        let mut fresh = pool.acquire().await.unwrap();
        assert_eq!(fresh.session_mut().id(), 1);
        assert!(!fresh.is_tainted());
        assert_eq!(factory.created(), 2);
        pool.release(fresh).await;
    }

    #[tokio::test]
    async fn never_exceeds_capacity() {
        let factory = ScriptedFactory::default();
        let pool = Arc::new(ResourcePool::new(factory.clone(), 2));

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                let handle = pool.acquire().await.unwrap();
                pool.release(handle).await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert_eq!(factory.created(), 2);

        pool.release(a).await;
        waiter.await.unwrap();
        pool.release(b).await;
        assert_eq!(factory.created(), 2);
    }

    #[tokio::test]
    async fn failed_create_frees_the_slot() {
        let factory = ScriptedFactory::default();
        let pool = ResourcePool::new(factory.clone(), 1);

        factory.fail_creates(true);
        assert!(pool.acquire().await.is_err());

        factory.fail_creates(false);
        let handle = pool.acquire().await.unwrap();
        pool.release(handle).await;
    }

    #[tokio::test]
    async fn shutdown_closes_idle_and_outstanding_sessions() {
        let factory = ScriptedFactory::default();
        let pool = ResourcePool::new(factory.clone(), 2);

        let idle = pool.acquire().await.unwrap();
        let outstanding = pool.acquire().await.unwrap();
        pool.release(idle).await;

        pool.shutdown().await;
        assert_eq!(factory.closed(), 1);
        assert!(pool.acquire().await.is_err());

        pool.release(outstanding).await;
        assert_eq!(factory.closed(), 2);
    }
}
