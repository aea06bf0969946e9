//! Process-wide candidate-transaction gate.
//!
//! Junos candidate-configuration locking is exclusive on the device, so two
//! transactions racing from the same process would just trade lock-RPC
//! rejections. The gate serializes whole lock -> commit -> unlock spans
//! across independently constructed [`Client`](crate::Client)s: a client
//! acquires the gate in `config_lock` and holds the guard until
//! `config_clear`.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::{Mutex, OwnedMutexGuard};

static GLOBAL_GATE: Lazy<CandidateGate> = Lazy::new(CandidateGate::new);

/// Cloneable handle to one exclusion scope.
///
/// Clones share the scope. [`CandidateGate::global`] returns the
/// process-wide default; callers coordinating a narrower scope (e.g. one
/// gate per target device) can construct their own instances.
#[derive(Debug, Clone, Default)]
pub struct CandidateGate {
    inner: Arc<Mutex<()>>,
}

impl CandidateGate {
    /// A fresh, independent gate.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default gate.
    pub fn global() -> Self {
        GLOBAL_GATE.clone()
    }

    /// Wait for exclusive ownership of the gate.
    pub async fn acquire(&self) -> CandidateGuard {
        CandidateGuard {
            _guard: self.inner.clone().lock_owned().await,
        }
    }

    /// Take the gate only if it is free.
    pub fn try_acquire(&self) -> Option<CandidateGuard> {
        self.inner
            .clone()
            .try_lock_owned()
            .ok()
            .map(|guard| CandidateGuard { _guard: guard })
    }
}

/// Exclusive ownership of a gate; releases on drop.
///
/// Must be held for the entire lock -> commit -> unlock span, not around
/// individual RPCs.
#[derive(Debug)]
pub struct CandidateGuard {
    _guard: OwnedMutexGuard<()>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_try_acquire_fails_while_held() {
        let gate = CandidateGate::new();
        let guard = gate.try_acquire().expect("free gate");
        assert!(gate.try_acquire().is_none());
        drop(guard);
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_clones_share_the_scope() {
        let gate = CandidateGate::new();
        let other = gate.clone();
        let _guard = gate.acquire().await;
        assert!(other.try_acquire().is_none());
    }

    #[tokio::test]
    async fn test_independent_gates_do_not_contend() {
        let a = CandidateGate::new();
        let b = CandidateGate::new();
        let _guard = a.acquire().await;
        assert!(b.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_transactions_serialize() {
        let gate = CandidateGate::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<&'static str>();

        let first = gate.acquire().await;
        let second_gate = gate.clone();
        let second_tx = tx.clone();
        let waiter = tokio::spawn(async move {
            let _guard = second_gate.acquire().await;
            second_tx.send("second").unwrap();
        });

        tokio::task::yield_now().await;
        tx.send("first").unwrap();
        drop(first);
        waiter.await.unwrap();

        assert_eq!(rx.recv().await, Some("first"));
        assert_eq!(rx.recv().await, Some("second"));
    }
}
