//! Cancellation signal threaded through connect retries and lock waits.
//!
//! Cancellation only prevents starting the next retry or poll iteration; an
//! RPC already in flight is never interrupted.

use std::time::Duration;

use tokio::sync::watch;

/// Create a linked cancel handle/token pair.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Caller-side handle that fires the cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Engine-side token observed inside retry and poll loops.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that never fires.
    pub fn never() -> Self {
        let (_, token) = cancel_pair();
        token
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `duration` unless the signal fires first.
    ///
    /// Returns `true` when the full sleep elapsed, `false` on cancellation.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.fired() => false,
        }
    }

    /// Resolve when the signal fires; pends forever on a `never` token.
    async fn fired(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Handle dropped without firing: this token can never fire.
                std::future::pending::<()>().await;
            }
        }
    }
}
