//! # Event Router
//!
//! Demultiplexes the single inbound delivery stream from the runtime.
//! Task-completion notices resolve entries in the pending-call table;
//! everything else fans out to the listeners registered for the envelope's
//! `(map, event, optional sub-target)` tuple.
//!
//! ## Invariants
//!
//! - Task completions take priority over event interpretation.
//! - An envelope for a torn-down map is dropped, never an error: teardown
//!   races against in-flight envelopes by design of the channel.
//! - Every matching listener is invoked; a panicking listener is isolated
//!   and cannot suppress delivery to the others.

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;

use mapwire::Envelope;

use crate::pending::PendingCallTable;
use crate::registry::IdentityRegistry;

/// Listener callback. Receives the full envelope; all non-routing fields
/// are opaque payload.
pub type ListenerFn = dyn Fn(&Envelope) + Send + Sync;

struct Registration {
    token: u64,
    event: String,
    target: Option<String>,
    callback: Arc<ListenerFn>,
}

/// Routes inbound envelopes to pending calls and event listeners.
pub struct EventRouter {
    pending: Arc<PendingCallTable>,
    registry: Arc<IdentityRegistry>,
    /// Listener registrations keyed by map id.
    listeners: DashMap<String, Vec<Registration>>,
    next_token: AtomicU64,
}

impl EventRouter {
    pub fn new(pending: Arc<PendingCallTable>, registry: Arc<IdentityRegistry>) -> Self {
        Self {
            pending,
            registry,
            listeners: DashMap::new(),
            next_token: AtomicU64::new(1),
        }
    }

    /// Registers a listener for `(map, event, optional target)` and returns
    /// a token for later removal. Multiple listeners may share a tuple.
    pub fn subscribe(
        &self,
        map_id: &str,
        event: &str,
        target: Option<&str>,
        callback: Arc<ListenerFn>,
    ) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entry(map_id.to_owned())
            .or_default()
            .push(Registration {
                token,
                event: event.to_owned(),
                target: target.map(str::to_owned),
                callback,
            });
        token
    }

    /// Removes one listener by token. Unknown tokens are a no-op.
    pub fn unsubscribe(&self, token: u64) {
        for mut entry in self.listeners.iter_mut() {
            entry.value_mut().retain(|reg| reg.token != token);
        }
    }

    /// Removes every listener for a sub-target, used on disposal.
    ///
    /// Safe to call even if nothing was ever registered for the target.
    pub fn remove_target(&self, map_id: &str, target: &str) {
        if let Some(mut regs) = self.listeners.get_mut(map_id) {
            regs.retain(|reg| reg.target.as_deref() != Some(target));
        }
    }

    /// Removes every listener for a map, used on map teardown.
    pub fn remove_map(&self, map_id: &str) {
        self.listeners.remove(map_id);
    }

    /// Routes one envelope from the inbound stream.
    pub fn dispatch(&self, mut envelope: Envelope) {
        // Async-task completions first: a taskId envelope is a call result,
        // not a user event. Stale or duplicate ids drop inside resolve.
        if let Some(task_id) = envelope.task_id {
            if let Some(error) = &envelope.error {
                tracing::debug!(task_id, error, "task completed with runtime error");
            }
            let result = envelope.take_result();
            self.pending.resolve(task_id, result);
            return;
        }

        let Some(map_id) = envelope.map_id.clone() else {
            tracing::debug!(kind = %envelope.kind, "envelope without map id, dropping");
            return;
        };

        // The map may have been torn down while the envelope was in flight.
        if !self.registry.is_used(&map_id) {
            tracing::debug!(%map_id, kind = %envelope.kind, "envelope for unknown map, dropping");
            return;
        }

        let target = envelope.target_id().map(str::to_owned);

        // Clone the matching callbacks out before invoking: a listener must
        // be free to subscribe or unsubscribe without deadlocking the shard.
        let matching: Vec<Arc<ListenerFn>> = match self.listeners.get(&map_id) {
            Some(regs) => regs
                .iter()
                .filter(|reg| reg.event == envelope.kind && reg.target == target)
                .map(|reg| reg.callback.clone())
                .collect(),
            None => Vec::new(),
        };

        for callback in matching {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(&envelope)));
            if outcome.is_err() {
                tracing::warn!(
                    %map_id,
                    kind = %envelope.kind,
                    "event listener panicked, continuing fan-out"
                );
            }
        }
    }
}
