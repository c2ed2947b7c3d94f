//! Mock transports for testing.
//!
//! These are used internally by the test suite and by hosts that want to
//! script the runtime side of the channel in-process.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use mapwire::CallInstruction;

use crate::transport;
use crate::transport::RuntimeTransport;

/// A channel-backed transport capturing every posted instruction.
///
/// Tests read instructions off the receiving end, decide on a result, and
/// feed a completion envelope back through the bridge's dispatch entry,
/// the same loop a real embedded runtime drives.
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelTransport {
    /// Creates the transport plus the receiver the "runtime" side reads.
    pub fn new() -> (Self, InstructionStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, InstructionStream::new(rx))
    }
}

#[async_trait::async_trait]
impl RuntimeTransport for ChannelTransport {
    async fn post(&self, wire: &str) -> transport::Result<()> {
        self.tx
            .send(wire.to_owned())
            .map_err(|_| transport::Error::Disconnected("Channel closed".into()))
    }
}

/// The runtime side of a [`ChannelTransport`].
pub struct InstructionStream {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl InstructionStream {
    fn new(rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Next raw instruction, or `None` once the bridge is gone.
    pub async fn next_raw(&self) -> Option<String> {
        self.rx.lock().await.recv().await
    }

    /// Next instruction, decoded. Panics on malformed wire data, which in
    /// a test means the encoder is broken.
    pub async fn next(&self) -> Option<CallInstruction> {
        let raw = self.next_raw().await?;
        Some(CallInstruction::from_wire(&raw).expect("malformed instruction on channel"))
    }
}

/// A transport that always fails, for exercising send-path degradation.
pub struct DisconnectedTransport;

#[async_trait::async_trait]
impl RuntimeTransport for DisconnectedTransport {
    async fn post(&self, _wire: &str) -> transport::Result<()> {
        Err(transport::Error::Disconnected("runtime never started".into()))
    }
}
