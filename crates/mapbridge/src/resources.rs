//! # Resource Request Multiplexer
//!
//! Handles every inbound fetch from the embedded runtime, from the very
//! first page-bootstrap request onward, branching strictly on the declared
//! operation tag: embedded assets, proxied web resources, or custom tile
//! data.
//!
//! ## Invariants
//!
//! - Every failure path writes an empty reply; nothing here raises into the
//!   transport layer.
//! - Handlers are idempotent: concurrent identical requests corrupt no
//!   shared state, and distinct requests only contend on the pooled HTTP
//!   connections.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use mapwire::ResourceQuery;
use mapwire::ResourceReply;
use mapwire::resource::ResourceOp;

use crate::assets::AssetStore;
use crate::assets::content_type_for;
use crate::tile::TileQuery;
use crate::tile::TileSourceRegistry;

/// Idle connections kept per destination host in the proxy pool.
const PROXY_POOL_PER_HOST: usize = 4;
/// How long an idle pooled connection may linger before being dropped.
const PROXY_POOL_IDLE: Duration = Duration::from_secs(30);
/// Upper bound on a single proxied fetch.
const PROXY_TIMEOUT: Duration = Duration::from_secs(20);

/// Routes inbound resource requests by declared operation.
pub struct ResourceMultiplexer {
    assets: Arc<AssetStore>,
    tiles: Arc<TileSourceRegistry>,
    /// The per-host-pooled outbound client shared by every proxy request.
    /// reqwest creates pool entries on first use of a host key without
    /// external locking, which is exactly the get-or-create contract the
    /// proxy branch needs.
    http: reqwest::Client,
    bootstrap_served: AtomicBool,
}

impl ResourceMultiplexer {
    pub fn new(assets: Arc<AssetStore>, tiles: Arc<TileSourceRegistry>) -> Self {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(PROXY_POOL_PER_HOST)
            .pool_idle_timeout(PROXY_POOL_IDLE)
            .timeout(PROXY_TIMEOUT)
            .build()
            // Builder only fails on TLS backend misconfiguration; fall back
            // to the default client rather than failing construction.
            .unwrap_or_default();

        Self {
            assets,
            tiles,
            http,
            bootstrap_served: AtomicBool::new(false),
        }
    }

    /// Handles one inbound fetch.
    pub async fn handle(&self, query: ResourceQuery) -> ResourceReply {
        match query.operation() {
            Some(ResourceOp::Embedded) => self.serve_embedded(&query),
            Some(ResourceOp::Proxy) => self.serve_proxy(&query).await,
            Some(ResourceOp::Tile) => self.serve_tile(&query).await,
            None => match &query.op {
                // Tagged with something we don't recognize: empty reply.
                Some(tag) => {
                    tracing::warn!(tag, "unknown resource operation, serving empty");
                    ResourceReply::empty()
                }
                // Untagged: the page bootstrap, exactly once per runtime
                // lifetime; afterwards an ordinary embedded fetch.
                None => {
                    if !self.bootstrap_served.swap(true, Ordering::SeqCst) {
                        self.serve_root()
                    } else {
                        self.serve_embedded(&query)
                    }
                }
            },
        }
    }

    fn serve_root(&self) -> ResourceReply {
        let name = self.assets.root_document().to_owned();
        match self.assets.get(&name) {
            Some(bytes) => ResourceReply::new(bytes.to_vec(), content_type_for(&name)),
            None => {
                tracing::warn!(root = %name, "root document missing from asset store");
                ResourceReply::empty()
            }
        }
    }

    fn serve_embedded(&self, query: &ResourceQuery) -> ResourceReply {
        let name = query.param("name").unwrap_or(self.assets.root_document());
        match self.assets.get(name) {
            Some(bytes) => ResourceReply::new(bytes.to_vec(), content_type_for(name)),
            None => {
                tracing::warn!(name, "embedded resource not found, serving empty");
                ResourceReply::empty()
            }
        }
    }

    async fn serve_proxy(&self, query: &ResourceQuery) -> ResourceReply {
        let Some(raw_url) = query.param("url") else {
            tracing::warn!("proxy request without url parameter");
            return ResourceReply::empty();
        };

        let Ok(url) = reqwest::Url::parse(raw_url) else {
            tracing::warn!(url = raw_url, "proxy request with unparseable url");
            return ResourceReply::empty();
        };

        if !matches!(url.scheme(), "http" | "https") {
            tracing::warn!(url = raw_url, scheme = url.scheme(), "proxy scheme rejected");
            return ResourceReply::empty();
        }

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = raw_url, error = %e, "proxy fetch failed");
                return ResourceReply::empty();
            }
        };

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        match response.bytes().await {
            Ok(body) => ResourceReply {
                body: body.to_vec(),
                content_type,
            },
            Err(e) => {
                tracing::warn!(url = raw_url, error = %e, "proxy body read failed");
                ResourceReply::empty()
            }
        }
    }

    async fn serve_tile(&self, query: &ResourceQuery) -> ResourceReply {
        let Some(source_id) = query.param("sourceId") else {
            tracing::warn!("tile request without sourceId parameter");
            return ResourceReply::empty();
        };

        let Some(tile) = TileQuery::from_query(query) else {
            tracing::warn!(source_id, "tile request with malformed coordinates");
            return ResourceReply::empty();
        };

        let Some(source) = self.tiles.get(source_id) else {
            tracing::debug!(source_id, "tile request for unknown source, serving empty");
            return ResourceReply::empty();
        };

        match source.fetch(&tile).await {
            Some(data) => ResourceReply::new(data.bytes, data.content_type),
            None => ResourceReply::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::tile::TileData;
    use crate::tile::TileSource;

    fn store() -> Arc<AssetStore> {
        Arc::new(
            AssetStore::new("index.html")
                .with_asset("index.html", b"<html>map</html>".to_vec())
                .with_asset("map.js", b"boot();".to_vec()),
        )
    }

    fn mux() -> ResourceMultiplexer {
        ResourceMultiplexer::new(store(), Arc::new(TileSourceRegistry::new()))
    }

    fn query(op: Option<&str>, params: &[(&str, &str)]) -> ResourceQuery {
        let params: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ResourceQuery::new(op, params)
    }

    #[tokio::test]
    async fn test_bootstrap_serves_root_once() {
        let mux = mux();

        let first = mux.handle(query(None, &[])).await;
        assert_eq!(first.body, b"<html>map</html>");
        assert_eq!(first.content_type.as_deref(), Some("text/html"));

        // Identical request after bootstrap: ordinary embedded fetch, which
        // defaults to the root document and still succeeds.
        let second = mux.handle(query(None, &[])).await;
        assert_eq!(second.body, b"<html>map</html>");
    }

    #[tokio::test]
    async fn test_embedded_known_and_unknown() {
        let mux = mux();

        let hit = mux
            .handle(query(Some("embedded"), &[("name", "map.js")]))
            .await;
        assert_eq!(hit.body, b"boot();");
        assert_eq!(hit.content_type.as_deref(), Some("text/javascript"));

        let miss = mux
            .handle(query(Some("embedded"), &[("name", "nope.js")]))
            .await;
        assert!(miss.is_empty());
        assert!(miss.content_type.is_none());
    }

    #[tokio::test]
    async fn test_unknown_operation_is_empty() {
        let reply = mux().handle(query(Some("teleport"), &[])).await;
        assert!(reply.is_empty());
    }

    #[tokio::test]
    async fn test_proxy_rejects_bad_urls() {
        let mux = mux();

        let no_url = mux.handle(query(Some("proxy"), &[])).await;
        assert!(no_url.is_empty());

        let bad_scheme = mux
            .handle(query(Some("proxy"), &[("url", "file:///etc/hosts")]))
            .await;
        assert!(bad_scheme.is_empty());

        let garbage = mux
            .handle(query(Some("proxy"), &[("url", "not a url")]))
            .await;
        assert!(garbage.is_empty());
    }

    struct CheckerboardSource;

    #[async_trait::async_trait]
    impl TileSource for CheckerboardSource {
        async fn fetch(&self, query: &TileQuery) -> Option<TileData> {
            Some(TileData {
                bytes: format!("{}/{}/{}", query.zoom, query.x, query.y).into_bytes(),
                content_type: "image/png".to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn test_tile_routing() {
        let tiles = Arc::new(TileSourceRegistry::new());
        tiles.register("source_1", Arc::new(CheckerboardSource));
        let mux = ResourceMultiplexer::new(store(), tiles);

        let hit = mux
            .handle(query(
                Some("tile"),
                &[("sourceId", "source_1"), ("x", "3"), ("y", "4"), ("zoom", "5")],
            ))
            .await;
        assert_eq!(hit.body, b"5/3/4");
        assert_eq!(hit.content_type.as_deref(), Some("image/png"));

        let miss = mux
            .handle(query(
                Some("tile"),
                &[("sourceId", "ghost"), ("x", "3"), ("y", "4"), ("zoom", "5")],
            ))
            .await;
        assert!(miss.is_empty());
    }
}
