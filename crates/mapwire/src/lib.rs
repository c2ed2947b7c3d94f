//! # Mapwire
//!
//! Wire layer for the map bridge: the instruction format carried into the
//! embedded runtime, the event envelopes carried back out, and the
//! resource-request shapes served to it.
//!
//! This crate is pure data transformation. It performs no I/O and holds no
//! state; the bridge runtime lives in `mapbridge`.

pub mod envelope;
pub mod error;
pub mod instruction;
pub mod resource;

pub use envelope::Envelope;
pub use error::Error;
pub use error::Result;
pub use instruction::CallInstruction;
pub use instruction::decode_result;
pub use resource::ResourceQuery;
pub use resource::ResourceReply;

#[cfg(test)]
mod tests;
