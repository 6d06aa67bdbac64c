//! Reusable fetch sessions.
//!
//! The pool starts empty and grows to the peak concurrency it is asked for.
//! A checked-out session is owned by its [`PooledSession`] guard and goes
//! back to the idle list when the guard drops, whichever way the unit of work
//! ended.

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::app::Result;

pub struct SessionPool<S> {
    idle: Mutex<Vec<S>>,
    created: AtomicUsize,
}

impl<S: Send + 'static> SessionPool<S> {
    pub fn new() -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Check out an idle session, or open a new one with `open`.
    pub async fn acquire<F, Fut>(self: &Arc<Self>, open: F) -> Result<PooledSession<S>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S>>,
    {
        let reused = self.idle.lock().unwrap_or_else(PoisonError::into_inner).pop();

        let session = match reused {
            Some(session) => session,
            None => {
                let session = open().await?;
                self.created.fetch_add(1, Ordering::SeqCst);
                tracing::debug!("Opened fetch session #{}", self.created());
                session
            }
        };

        Ok(PooledSession {
            session: Some(session),
            pool: Arc::clone(self),
        })
    }

    fn release(&self, session: S) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(session);
    }

    /// Take every idle session out of the pool.
    pub fn drain(&self) -> Vec<S> {
        std::mem::take(&mut *self.idle.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of sessions opened over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<S: Send + 'static> Default for SessionPool<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// A checked-out session. Returned to its pool on drop.
pub struct PooledSession<S: Send + 'static> {
    session: Option<S>,
    pool: Arc<SessionPool<S>>,
}

impl<S: Send + 'static> Deref for PooledSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.session.as_ref().expect("session is present until drop")
    }
}

impl<S: Send + 'static> DerefMut for PooledSession<S> {
    fn deref_mut(&mut self) -> &mut S {
        self.session.as_mut().expect("session is present until drop")
    }
}

impl<S: Send + 'static> Drop for PooledSession<S> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.release(session);
        }
    }
}
