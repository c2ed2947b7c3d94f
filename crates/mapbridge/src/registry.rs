//! # Identity Registry
//!
//! Allocates and tracks the unique identifiers shared across the bridge:
//! maps, layers, sources, markers, controls, animations, drawing managers.
//!
//! Uses DashMap's set form for concurrent allocation without global locking.
//! The registry is an explicitly-owned instance held by the bridge, never a
//! process-wide singleton, so independent bridges in one process (or one
//! test binary) cannot contaminate each other's id space.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashSet;

/// Tracks every live cross-bridge identifier.
///
/// Ids are strings: either a caller-supplied candidate accepted verbatim, or
/// a generated `"{namespace}_{n}"` where `n` comes from a single shared
/// monotonic counter. The counter is never rewound, even after release, so
/// generated ids cannot collide with each other regardless of set contents.
pub struct IdentityRegistry {
    used: DashSet<String>,
    counter: AtomicU64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self {
            used: DashSet::new(),
            counter: AtomicU64::new(1),
        }
    }

    /// Allocates a unique id in `namespace`.
    ///
    /// A provided candidate is accepted verbatim iff it is not already in
    /// use. This carries a caller's own identifier across the bridge so
    /// later envelopes can be matched back to the object that produced them
    /// (e.g. geometry returned for a data record keyed by the record's own
    /// id field). A colliding candidate is discarded with a diagnostic and
    /// a fresh id is generated instead.
    pub fn allocate(&self, namespace: &str, candidate: Option<&str>) -> String {
        if let Some(candidate) = candidate {
            // insert() returning true is the commit point; two concurrent
            // callers racing on the same candidate cannot both win.
            if self.used.insert(candidate.to_owned()) {
                return candidate.to_owned();
            }
            tracing::warn!(
                namespace,
                candidate,
                "candidate id already in use, generating a fresh one"
            );
        }

        loop {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            let id = format!("{}_{}", namespace, n);
            if self.used.insert(id.clone()) {
                return id;
            }
            // Only reachable when a caller previously supplied a candidate
            // shaped like a generated id; the monotonic counter moves past it.
        }
    }

    /// Releases an id back to the unused pool.
    ///
    /// Best-effort cleanup: ownership is not validated, and releasing an
    /// unknown id is a no-op.
    pub fn release(&self, id: &str) {
        self.used.remove(id);
    }

    /// Whether an id is currently live.
    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
