//! # Error Definitions
//!
//! Failures in the wire layer. These never escape the bridge: callers decode
//! to absence and log rather than propagating a crash into the dispatch loop.

/// Operational failures while encoding or decoding wire payloads.
#[derive(Debug)]
pub enum Error {
    /// JSON serialization of an argument or instruction failed.
    Serialization(serde_json::Error),
    /// The instruction payload was not valid base64.
    Encoding(String),
    /// The internal structure of the message was malformed.
    Malformed(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialization(e) => write!(f, "Serialization error: {}", e),
            Self::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            Self::Malformed(msg) => write!(f, "Malformed payload: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(e: base64::DecodeError) -> Self {
        Self::Encoding(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
