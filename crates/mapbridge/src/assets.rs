//! # Embedded Assets
//!
//! The bundled asset set served to the embedded runtime: the root document
//! that bootstraps the page, plus the scripts, styles, and images the map
//! control ships with. Populated once by the hosting glue, read-only after.

use std::collections::HashMap;

/// Named byte blobs bundled with the control.
pub struct AssetStore {
    assets: HashMap<String, Vec<u8>>,
    root_document: String,
}

impl AssetStore {
    /// Creates an empty store whose bootstrap request serves `root_document`.
    pub fn new(root_document: &str) -> Self {
        Self {
            assets: HashMap::new(),
            root_document: root_document.to_owned(),
        }
    }

    /// Adds one asset. Builder-style, consumed during setup.
    pub fn with_asset(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.assets.insert(name.to_owned(), bytes);
        self
    }

    /// Name of the root document served on bootstrap.
    pub fn root_document(&self) -> &str {
        &self.root_document
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.assets.get(name).map(Vec::as_slice)
    }
}

/// Infers a content type from a resource name's extension.
///
/// Unknown extensions fall back to `application/octet-stream`; the runtime
/// treats the bytes as opaque either way.
pub fn content_type_for(name: &str) -> &'static str {
    let extension = name.rsplit('.').next().unwrap_or_default();
    match extension {
        "html" | "htm" => "text/html",
        "js" => "text/javascript",
        "css" => "text/css",
        "json" | "geojson" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain",
        "pbf" => "application/x-protobuf",
        _ => "application/octet-stream",
    }
}
