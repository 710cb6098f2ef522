use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

use tokio::sync::Notify;

use crate::{Result, RetryError};

/// Interrupts retry waits, from any thread.
///
/// Clones share state. Once cancelled a token stays cancelled; every wait
/// that observes it returns [`RetryError::Interrupted`], and no further
/// attempts are started by the retry loop that owns the wait.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels the token and wakes every blocked or suspended wait.
    pub fn cancel(&self) {
        let mut cancelled = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled = true;
        self.inner.condvar.notify_all();
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        *self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks the calling thread for `timeout` unless cancelled first.
    pub fn wait_blocking(&self, timeout: Duration) -> Result<()> {
        let guard = self
            .inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .inner
            .condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        if *guard {
            Err(RetryError::Interrupted)
        } else {
            Ok(())
        }
    }

    /// Suspends the current task for `timeout` unless cancelled first.
    ///
    /// Uses the tokio timer; no thread is held while waiting.
    pub async fn wait(&self, timeout: Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(RetryError::Interrupted),
            _ = tokio::time::sleep(timeout) => Ok(()),
        }
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent `cancel` is not missed.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}
