// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Cooperative cancellation.
//!
//! Long-running operations (expansion, metadata resolution, paged browse)
//! take a [`CancellationSignal`] and check it between service calls. A
//! cancelled operation stops at the next check: results already handed out
//! stay valid and no further result is produced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use crate::error::{OpcUaError, OpcUaResult};

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable cancellation flag shared between a caller and an operation.
///
/// # Example
///
/// ```
/// use uagraph_core::cancel::CancellationSignal;
///
/// let signal = CancellationSignal::new();
/// let observer = signal.clone();
/// signal.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

impl CancellationSignal {
    /// Creates a signal that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Repeated calls are no-ops.
    pub fn cancel(&self) {
        if self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            debug!("Cancellation requested");
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns `true` once cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(OpcUaError::Cancelled)` if cancellation has been requested.
    #[inline]
    pub fn check(&self) -> OpcUaResult<()> {
        if self.is_cancelled() {
            Err(OpcUaError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Cancels the signal after `deadline` elapses.
    ///
    /// Must be called from within a tokio runtime.
    pub fn cancel_after(&self, deadline: Duration) -> tokio::task::JoinHandle<()> {
        let signal = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    debug!(deadline_ms = deadline.as_millis() as u64, "Operation deadline reached");
                    signal.cancel();
                }
                _ = signal.cancelled() => {}
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared() {
        let signal = CancellationSignal::new();
        let clone = signal.clone();
        assert!(clone.check().is_ok());
        signal.cancel();
        signal.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(OpcUaError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_resolves() {
        let signal = CancellationSignal::new();
        let waiter = signal.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });
        tokio::task::yield_now().await;
        signal.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_deadline() {
        let signal = CancellationSignal::new();
        let handle = signal.cancel_after(Duration::from_millis(50));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.await.unwrap();
        assert!(signal.is_cancelled());
    }
}
