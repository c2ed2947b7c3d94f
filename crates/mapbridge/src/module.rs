//! # Module Load Coordinator
//!
//! Certain commands are only valid after a named capability ("module") has
//! been loaded into the runtime: a bundle of script and style resources.
//! This coordinator guarantees each module is loaded at most once, with
//! concurrent requesters parked on the same load.
//!
//! Waiters block on a watch channel rather than polling: the first caller
//! flips the channel once the load instruction completes and every waiter
//! resumes immediately.
//!
//! ## Invariants
//!
//! - At most one load instruction per module name is ever issued.
//! - NotRequested→Loading and Loading→Loaded each happen exactly once per
//!   name; no caller proceeds before Loaded.

use std::future::Future;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

/// A named bundle of runtime-side resources.
#[derive(Debug, Clone)]
pub struct ModuleDescriptor {
    pub name: String,
    pub script_resources: Vec<String>,
    pub style_resources: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            script_resources: Vec::new(),
            style_resources: Vec::new(),
        }
    }

    pub fn script(mut self, resource: &str) -> Self {
        self.script_resources.push(resource.to_owned());
        self
    }

    pub fn style(mut self, resource: &str) -> Self {
        self.style_resources.push(resource.to_owned());
        self
    }
}

enum Phase {
    Loading(watch::Receiver<bool>),
    Loaded,
}

/// The role a caller drew under the entry lock.
enum Role {
    Done,
    Wait(watch::Receiver<bool>),
    Load(watch::Sender<bool>),
}

/// Synchronizes module loading across concurrent callers.
pub struct ModuleLoadCoordinator {
    modules: DashMap<String, Phase>,
}

impl ModuleLoadCoordinator {
    pub fn new() -> Self {
        Self {
            modules: DashMap::new(),
        }
    }

    /// Ensures `name` is loaded, issuing `load` at most once process-wide.
    ///
    /// The first caller for a name runs `load` and flips the phase to
    /// Loaded when it completes; every other caller parks until then. The
    /// load future itself decides what a failed instruction means: the
    /// bridge degrades it to a default result, so the phase still advances
    /// and waiters are never stranded.
    pub async fn ensure_loaded<F, Fut>(&self, name: &str, load: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        // Decide the caller's role under the entry lock, then release it
        // before any await: holding a shard guard across a suspension would
        // block unrelated modules.
        let role = match self.modules.entry(name.to_owned()) {
            Entry::Occupied(entry) => match entry.get() {
                Phase::Loaded => Role::Done,
                Phase::Loading(rx) => Role::Wait(rx.clone()),
            },
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(false);
                entry.insert(Phase::Loading(rx));
                Role::Load(tx)
            }
        };

        match role {
            Role::Done => {}
            Role::Wait(mut rx) => {
                // wait_for also returns Err when the loader's sender
                // dropped without sending; either way the phase settled.
                let _ = rx.wait_for(|done| *done).await;
            }
            Role::Load(tx) => {
                load().await;
                self.modules.insert(name.to_owned(), Phase::Loaded);
                let _ = tx.send(true);
            }
        }
    }

    /// Non-blocking query for already-confirmed modules, used to
    /// short-circuit optional loads.
    pub fn is_loaded(&self, name: &str) -> bool {
        matches!(self.modules.get(name).as_deref(), Some(Phase::Loaded))
    }
}

impl Default for ModuleLoadCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
