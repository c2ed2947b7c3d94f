//! # Resource Requests
//!
//! The shapes exchanged when the embedded runtime fetches something from the
//! native side: embedded assets, proxied web resources, custom tile data,
//! and the one-shot page bootstrap.

use std::collections::HashMap;

/// A declared operation on the resource channel.
///
/// Requests without a tag are bootstrap/plain fetches; everything else must
/// name one of these tags or it falls back to an empty reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceOp {
    /// Bundled asset lookup by name.
    Embedded,
    /// Outbound web fetch on the runtime's behalf.
    Proxy,
    /// Tile data from a native tile-source callback.
    Tile,
}

impl ResourceOp {
    /// Parses an operation tag. Unknown tags map to `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "embedded" => Some(Self::Embedded),
            "proxy" => Some(Self::Proxy),
            "tile" => Some(Self::Tile),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::Proxy => "proxy",
            Self::Tile => "tile",
        }
    }
}

/// One inbound fetch from the runtime: an optional operation tag plus
/// free-form query parameters.
#[derive(Debug, Clone)]
pub struct ResourceQuery {
    pub op: Option<String>,
    pub params: HashMap<String, String>,
}

impl ResourceQuery {
    pub fn new(op: Option<&str>, params: HashMap<String, String>) -> Self {
        Self {
            op: op.map(str::to_owned),
            params,
        }
    }

    /// The declared operation, when the tag is present and known.
    pub fn operation(&self) -> Option<ResourceOp> {
        self.op.as_deref().and_then(ResourceOp::from_tag)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// The response written back for one resource request.
///
/// Every failure path degrades to `empty()`: the runtime sees a blank
/// resource, never a propagated error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceReply {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

impl ResourceReply {
    pub fn new(body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            body,
            content_type: Some(content_type.into()),
        }
    }

    /// The blank reply used on every failure path.
    pub fn empty() -> Self {
        Self {
            body: Vec::new(),
            content_type: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}
