//! # Pending Call Table
//!
//! Correlates an outbound call with its eventual result. Each registered
//! call gets a numeric id and a single-resolution slot; the completion
//! notice that re-enters through the event router fills the slot and wakes
//! the suspended caller.
//!
//! ## Invariants
//!
//! - A call id, once resolved, is removed; a duplicate or stale completion
//!   for the same id is a no-op and never disturbs a future id.
//! - Resolution order is independent of issue order; the runtime may finish
//!   a later call first.
//! - Call ids come from their own counter and never collide with object
//!   ids, which live in a separate string namespace.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;

/// Table of outstanding calls awaiting completion.
pub struct PendingCallTable {
    slots: DashMap<u64, oneshot::Sender<Value>>,
    next_id: AtomicU64,
}

impl PendingCallTable {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a fresh call and returns its id plus the awaitable the
    /// caller suspends on. This is the sole suspension point exposed to
    /// object-model consumers.
    pub fn register(&self) -> (u64, oneshot::Receiver<Value>) {
        let call_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.slots.insert(call_id, tx);
        (call_id, rx)
    }

    /// Resolves a call with its raw result.
    ///
    /// Returns whether an entry was found. A late, duplicate, or mistyped
    /// id is silently ignored: it must never throw or stall the dispatch
    /// loop.
    pub fn resolve(&self, call_id: u64, raw: Value) -> bool {
        let Some((_, tx)) = self.slots.remove(&call_id) else {
            tracing::debug!(call_id, "completion for unknown call id, dropping");
            return false;
        };

        // The caller may have given up (timeout); a dead receiver is fine.
        let _ = tx.send(raw);
        true
    }

    /// Removes an entry whose instruction never made it to the runtime.
    ///
    /// Used on the send path: a transport or encode failure means no
    /// completion will ever arrive, so the slot is reclaimed and the caller
    /// resolves locally to a default value.
    pub fn abandon(&self, call_id: u64) {
        self.slots.remove(&call_id);
    }

    /// Number of calls still awaiting completion.
    pub fn outstanding(&self) -> usize {
        self.slots.len()
    }
}

impl Default for PendingCallTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_delivers_to_matching_register() {
        let table = PendingCallTable::new();
        let (id_a, rx_a) = table.register();
        let (id_b, rx_b) = table.register();
        assert_ne!(id_a, id_b);

        // Out-of-order resolution is fine.
        assert!(table.resolve(id_b, json!("b")));
        assert!(table.resolve(id_a, json!("a")));

        assert_eq!(rx_a.await.unwrap(), json!("a"));
        assert_eq!(rx_b.await.unwrap(), json!("b"));
        assert_eq!(table.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_resolution_are_noops() {
        let table = PendingCallTable::new();
        let (id, rx) = table.register();

        assert!(table.resolve(id, json!(1)));
        assert!(!table.resolve(id, json!(2)));
        assert!(!table.resolve(9999, json!(3)));

        assert_eq!(rx.await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_abandon_reclaims_slot() {
        let table = PendingCallTable::new();
        let (id, rx) = table.register();
        table.abandon(id);

        assert_eq!(table.outstanding(), 0);
        assert!(!table.resolve(id, json!(1)));
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_with_dropped_receiver_is_noop() {
        let table = PendingCallTable::new();
        let (id, rx) = table.register();
        drop(rx);
        // Entry still present; resolving it must not panic.
        assert!(table.resolve(id, json!(1)));
    }
}
