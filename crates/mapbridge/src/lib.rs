//! # Mapbridge
//!
//! The native side of a map control whose rendering and geospatial logic
//! run inside an embedded UI runtime. The two execution contexts are joined
//! by one asynchronous message channel; this crate is that bridge: call
//! dispatch and result correlation, event routing, cross-context object
//! identity, module-load synchronization, and resource serving.

pub mod assets;
pub mod bridge;
pub mod events;
pub mod mock;
pub mod module;
pub mod pending;
pub mod registry;
pub mod resources;
pub mod tile;
pub mod transport;

pub use assets::AssetStore;
pub use bridge::MapBridge;
pub use module::ModuleDescriptor;
pub use registry::IdentityRegistry;
pub use tile::TileData;
pub use tile::TileQuery;
pub use tile::TileSource;
pub use transport::RuntimeTransport;
