//! # Call Instructions
//!
//! Encodes an outbound command into the transportable instruction format and
//! decodes raw results back into typed values.
//!
//! The instruction channel into the embedded runtime cannot carry raw
//! newlines, so string arguments are newline-flattened before serialization
//! and the joined argument list is base64-encoded. The newline then doubles
//! as an unambiguous separator: serialized JSON never contains a literal one.
//!
//! ## Invariants
//! - Decoding never panics on unknown data; malformed results decode to
//!   absence with a diagnostic.
//! - `encode` then `decoded_args` round-trips every argument list whose
//!   string values contain no newlines; newline-bearing strings round-trip
//!   with newlines flattened to spaces.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::error::Result;

/// One outbound instruction: a command plus its encoded argument list,
/// correlated back to the issuing call by `call_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInstruction {
    #[serde(rename = "callId")]
    pub call_id: u64,
    /// Optional map scope; a scoped command executes against one map
    /// instance, an unscoped one against the runtime itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub command: String,
    /// Base64 of the newline-joined, independently-serialized arguments.
    pub args: String,
}

impl CallInstruction {
    /// Encodes a command and argument list into an instruction.
    pub fn encode(
        call_id: u64,
        scope: Option<&str>,
        command: &str,
        args: &[Value],
    ) -> Result<Self> {
        let mut parts = Vec::with_capacity(args.len());
        for arg in args {
            let json = serde_json::to_string(&flatten_newlines(arg))?;
            parts.push(json);
        }

        Ok(Self {
            call_id,
            scope: scope.map(str::to_owned),
            command: command.to_owned(),
            args: BASE64.encode(parts.join("\n")),
        })
    }

    /// Serializes the instruction for the transport channel.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an instruction off the transport channel.
    ///
    /// Used by the runtime side of the channel; on the native side only
    /// tests and mock runtimes need it.
    pub fn from_wire(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Recovers the original argument list from the encoded payload.
    pub fn decoded_args(&self) -> Result<Vec<Value>> {
        let joined = BASE64.decode(&self.args)?;
        let joined = String::from_utf8(joined)
            .map_err(|e| Error::Malformed(e.to_string()))?;

        if joined.is_empty() {
            return Ok(Vec::new());
        }

        joined
            .split('\n')
            .map(|part| serde_json::from_str(part).map_err(Error::from))
            .collect()
    }
}

/// Flattens embedded newlines in string values to spaces.
///
/// Only the top-level argument value is rewritten; nested objects are
/// already newline-safe once serialized.
fn flatten_newlines(value: &Value) -> Value {
    match value {
        Value::String(s) if s.contains(['\n', '\r']) => {
            let flat = s
                .replace("\r\n", " ")
                .replace(['\n', '\r'], " ");
            Value::String(flat)
        }
        other => other.clone(),
    }
}

/// Decodes a raw call result into a typed value.
///
/// `Null`, the empty string, and the empty object all decode to `None`
/// rather than attempting a parse: the runtime answers intentionally-void
/// commands with exactly these shapes. Malformed payloads also decode to
/// `None`, with a diagnostic, so a bad result never crashes the caller.
pub fn decode_result<T: DeserializeOwned>(raw: &Value) -> Option<T> {
    if is_absent(raw) {
        return None;
    }

    match serde_json::from_value(raw.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "failed to decode call result, treating as absent");
            None
        }
    }
}

fn is_absent(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
