//! # Transport Abstraction
//!
//! A minimal, async interface for posting instructions into the embedded
//! runtime.
//!
//! ## Philosophy
//!
//! - **Write-Only**: the native side only ever pushes instructions down this
//!   channel. Everything inbound (events, task completions, resource
//!   requests) re-enters through the bridge's dispatch entry points, because
//!   the runtime owns the single delivery stream.
//! - **String-Oriented**: the transport carries opaque serialized
//!   instructions. It knows nothing about commands, envelopes, or ids.

use std::fmt;

/// Errors at the instruction-channel layer.
#[derive(Debug, Clone)]
pub enum Error {
    /// The runtime surface is gone or the channel was dropped.
    Disconnected(String),
    /// The instruction could not be serialized for the channel.
    Serialization(String),
    /// Generic I/O failure inside the hosting glue.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected(msg) => write!(f, "Runtime disconnected: {}", msg),
            Self::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// A mechanism to deliver one serialized instruction to the runtime.
///
/// This trait is designed to be object-safe (`Arc<dyn RuntimeTransport>`).
///
/// # invariants
/// - Must return `Ok(())` once the instruction is handed to the channel;
///   delivery is fire-and-forget, the result arrives as an envelope.
/// - Must return `Err` if the channel rejects the payload.
/// - Must not interpret the payload content.
#[async_trait::async_trait]
pub trait RuntimeTransport: Send + Sync + 'static {
    async fn post(&self, wire: &str) -> Result<()>;
}
