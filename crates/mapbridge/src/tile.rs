//! # Tile Sources
//!
//! A tile source produces map imagery on demand, addressed by the
//! `(x, y, zoom)` coordinate triple. Sources registered here are reachable
//! from the resource multiplexer across all live maps: the runtime asks for
//! a tile by source id, and the bridge delegates to the owning callback.

use std::sync::Arc;

use dashmap::DashMap;

use mapwire::ResourceQuery;

/// Coordinates and shape of one requested tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileQuery {
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
    /// Bing-style quadkey, when the runtime supplies one.
    pub quadkey: Option<String>,
    /// Projected bounding box as `[west, south, east, north]`.
    pub bounds: Option<[f64; 4]>,
    /// Requested tile edge length in pixels.
    pub size: Option<u32>,
}

impl TileQuery {
    /// Extracts tile coordinates from a resource request's parameters.
    ///
    /// `x`, `y`, and `zoom` are required; the rest is optional detail a
    /// source may use or ignore.
    pub fn from_query(query: &ResourceQuery) -> Option<Self> {
        let x = query.param("x")?.parse().ok()?;
        let y = query.param("y")?.parse().ok()?;
        let zoom = query.param("zoom")?.parse().ok()?;

        let bounds = query.param("bounds").and_then(parse_bounds);
        let size = query.param("tileSize").and_then(|s| s.parse().ok());

        Some(Self {
            x,
            y,
            zoom,
            quadkey: query.param("quadkey").map(str::to_owned),
            bounds,
            size,
        })
    }
}

fn parse_bounds(raw: &str) -> Option<[f64; 4]> {
    let mut parts = raw.split(',').map(str::trim).map(str::parse::<f64>);
    let bounds = [
        parts.next()?.ok()?,
        parts.next()?.ok()?,
        parts.next()?.ok()?,
        parts.next()?.ok()?,
    ];
    parts.next().is_none().then_some(bounds)
}

/// The data produced for one tile.
#[derive(Debug, Clone)]
pub struct TileData {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Native callback producing tile data on demand.
///
/// Returning `None` means "no tile here"; the multiplexer relays it as an
/// empty reply rather than an error.
#[async_trait::async_trait]
pub trait TileSource: Send + Sync + 'static {
    async fn fetch(&self, query: &TileQuery) -> Option<TileData>;
}

/// Registry of tile sources shared across all live maps.
///
/// Keyed by the source's bridge id; lookups from concurrent tile requests
/// only contend per shard.
pub struct TileSourceRegistry {
    sources: DashMap<String, Arc<dyn TileSource>>,
}

impl TileSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: DashMap::new(),
        }
    }

    pub fn register(&self, id: &str, source: Arc<dyn TileSource>) {
        self.sources.insert(id.to_owned(), source);
    }

    pub fn remove(&self, id: &str) {
        self.sources.remove(id);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TileSource>> {
        self.sources.get(id).map(|entry| entry.value().clone())
    }
}

impl Default for TileSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
