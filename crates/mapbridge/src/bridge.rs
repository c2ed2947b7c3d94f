//! # Map Bridge
//!
//! The facade tying the bridge together: outbound calls in, envelopes and
//! resource requests back out to their handlers.
//!
//! Data flow: `invoke` serializes the arguments and registers a pending
//! call, the instruction crosses into the runtime over the transport, and
//! the completion notice re-enters through `dispatch`, resolving the entry
//! and resuming the suspended caller. The runtime's unsolicited events fan
//! out through the same `dispatch` entry point; its resource fetches arrive
//! through `handle_resource`.
//!
//! ## Failure semantics
//!
//! Nothing here is fatal. Encode and send failures resolve the call locally
//! to `Null`; parse failures drop the envelope; resource failures serve
//! empty. One bad message never blocks the next.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;

use mapwire::CallInstruction;
use mapwire::Envelope;
use mapwire::ResourceQuery;
use mapwire::ResourceReply;

use crate::assets::AssetStore;
use crate::events::EventRouter;
use crate::events::ListenerFn;
use crate::module::ModuleDescriptor;
use crate::module::ModuleLoadCoordinator;
use crate::pending::PendingCallTable;
use crate::registry::IdentityRegistry;
use crate::resources::ResourceMultiplexer;
use crate::tile::TileSource;
use crate::tile::TileSourceRegistry;
use crate::transport::RuntimeTransport;

/// One logical channel to one embedded-runtime instance.
///
/// The bridge owns its registries outright; two bridges in one process
/// share nothing, which keeps parallel tests (and parallel map surfaces)
/// independent.
pub struct MapBridge {
    transport: Arc<dyn RuntimeTransport>,
    registry: Arc<IdentityRegistry>,
    pending: Arc<PendingCallTable>,
    modules: ModuleLoadCoordinator,
    router: EventRouter,
    tiles: Arc<TileSourceRegistry>,
    resources: ResourceMultiplexer,
    /// Optional bound on how long a call may await its completion before
    /// resolving to `Null`. The runtime is assumed co-terminant with the
    /// host, so the default is to wait indefinitely.
    call_timeout: Option<Duration>,
}

impl MapBridge {
    pub fn new(transport: Arc<dyn RuntimeTransport>, assets: AssetStore) -> Self {
        let registry = Arc::new(IdentityRegistry::new());
        let pending = Arc::new(PendingCallTable::new());
        let tiles = Arc::new(TileSourceRegistry::new());
        let assets = Arc::new(assets);

        Self {
            transport,
            router: EventRouter::new(pending.clone(), registry.clone()),
            resources: ResourceMultiplexer::new(assets, tiles.clone()),
            registry,
            pending,
            modules: ModuleLoadCoordinator::new(),
            tiles,
            call_timeout: None,
        }
    }

    /// Bounds every call's wait for completion. An expired call resolves to
    /// `Null` and its table entry is reclaimed instead of leaking.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    // ------------------------------------------------------------------
    // Outbound call surface
    // ------------------------------------------------------------------

    /// Issues a command into the runtime and suspends until its completion
    /// notice arrives. `scope` optionally namespaces the command to one map
    /// instance.
    pub async fn invoke(&self, scope: Option<&str>, command: &str, args: &[Value]) -> Value {
        let (call_id, rx) = self.pending.register();

        let wire = CallInstruction::encode(call_id, scope, command, args)
            .and_then(|instruction| instruction.to_wire());
        let wire = match wire {
            Ok(wire) => wire,
            Err(e) => {
                tracing::warn!(command, error = %e, "failed to encode instruction");
                self.pending.abandon(call_id);
                return Value::Null;
            }
        };

        if let Err(e) = self.transport.post(&wire).await {
            tracing::warn!(command, error = %e, "failed to post instruction");
            self.pending.abandon(call_id);
            return Value::Null;
        }

        match self.call_timeout {
            None => rx.await.unwrap_or(Value::Null),
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(result) => result.unwrap_or(Value::Null),
                Err(_) => {
                    tracing::warn!(command, call_id, "call timed out, resolving to null");
                    self.pending.abandon(call_id);
                    Value::Null
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Inbound surfaces
    // ------------------------------------------------------------------

    /// The single inbound-envelope entry point. Accepts one serialized
    /// envelope off the runtime's delivery stream.
    pub fn dispatch(&self, raw: &str) {
        match Envelope::parse(raw) {
            Ok(envelope) => self.router.dispatch(envelope),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable envelope, dropping");
            }
        }
    }

    /// The resource-request entry point, including the page bootstrap.
    pub async fn handle_resource(
        &self,
        op: Option<&str>,
        params: HashMap<String, String>,
    ) -> ResourceReply {
        self.resources.handle(ResourceQuery::new(op, params)).await
    }

    // ------------------------------------------------------------------
    // Module loading
    // ------------------------------------------------------------------

    /// Ensures a module's script and style resources are loaded into the
    /// runtime, issuing at most one `loadModule` instruction per name no
    /// matter how many callers race here.
    pub async fn ensure_module(&self, descriptor: &ModuleDescriptor) {
        let args = [json!({
            "name": descriptor.name,
            "scripts": descriptor.script_resources,
            "styles": descriptor.style_resources,
        })];
        self.modules
            .ensure_loaded(&descriptor.name, || async move {
                self.invoke(None, "loadModule", &args).await;
            })
            .await;
    }

    /// Whether a module's load has already been confirmed.
    pub fn is_module_loaded(&self, name: &str) -> bool {
        self.modules.is_loaded(name)
    }

    // ------------------------------------------------------------------
    // Object and listener registration
    // ------------------------------------------------------------------

    /// Registers a cross-bridge object and returns its id. A caller-supplied
    /// candidate id is kept when free, replaced when taken.
    pub fn register_object(&self, namespace: &str, candidate: Option<&str>) -> String {
        self.registry.allocate(namespace, candidate)
    }

    /// Releases an object id and drops its listeners.
    pub fn release_object(&self, id: &str) {
        self.registry.release(id);
        self.router.remove_map(id);
    }

    /// Registers a tile source under an allocated id so inbound tile
    /// requests can reach it from any live map.
    pub fn register_tile_source(&self, id: &str, source: Arc<dyn TileSource>) {
        self.tiles.register(id, source);
    }

    pub fn remove_tile_source(&self, id: &str) {
        self.tiles.remove(id);
    }

    /// Subscribes a listener; see [`EventRouter::subscribe`].
    pub fn on(
        &self,
        map_id: &str,
        event: &str,
        target: Option<&str>,
        callback: Arc<ListenerFn>,
    ) -> u64 {
        self.router.subscribe(map_id, event, target, callback)
    }

    /// Removes one listener by token.
    pub fn off(&self, token: u64) {
        self.router.unsubscribe(token);
    }

    /// Removes every listener for a sub-target, used on disposal. Safe when
    /// nothing was ever registered.
    pub fn off_target(&self, map_id: &str, target: &str) {
        self.router.remove_target(map_id, target);
    }

    /// Calls still awaiting their completion notice.
    pub fn outstanding_calls(&self) -> usize {
        self.pending.outstanding()
    }
}
