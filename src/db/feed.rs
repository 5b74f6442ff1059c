// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ledger change notifications.
//!
//! Stores publish a [`LedgerChange`] after every successful ledger write.
//! Listeners either hold a raw broadcast receiver (the SSE route) or register
//! a callback that runs on its own task until the [`Subscription`] is dropped.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Buffered notifications per receiver before it starts lagging.
const FEED_CAPACITY: usize = 256;

/// A committed ledger mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerChange {
    pub user_id: String,
    pub total_points: u64,
    pub version: u64,
}

/// Broadcast hub for ledger changes.
#[derive(Debug, Clone)]
pub struct LedgerFeed {
    tx: broadcast::Sender<LedgerChange>,
}

impl Default for LedgerFeed {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }
}

impl LedgerFeed {
    /// Publish a change. Having no listeners is not an error.
    pub fn publish(&self, change: LedgerChange) {
        let _ = self.tx.send(change);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.tx.subscribe()
    }

    /// Invoke `callback` for every change until the returned handle is dropped.
    ///
    /// Must be called from within a tokio runtime. A lagging listener skips
    /// the missed changes and continues; it does not receive them late.
    pub fn on_change<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(LedgerChange) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(change) => callback(change),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Ledger listener lagged, changes skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Subscription { handle }
    }
}

/// Active callback registration. Dropping it stops delivery.
#[derive(Debug)]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
