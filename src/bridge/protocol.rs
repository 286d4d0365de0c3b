//! Duplex channel control protocol
//!
//! Inbound messages from the browser are JSON-tagged; anything with an
//! unrecognized `type` is ignored, not rejected. Outbound traffic is raw
//! PTY bytes, plus one text line for terminal-fatal diagnostics.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;

use super::error::BridgeError;

/// Inbound control message
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Raw text appended to the remote stdin
    Input { data: String },
    /// PTY window-change request
    Resize { cols: u16, rows: u16 },
    /// Forward-compatibility: unknown tags decode here instead of erroring
    #[serde(other)]
    Unknown,
}

/// Parse one inbound message. Malformed JSON is a protocol error the caller
/// logs and skips — the session continues.
pub fn parse_control_message(raw: &str) -> Result<ControlMessage, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Outbound half of the duplex channel
#[async_trait]
pub trait DuplexSink: Send {
    /// Forward raw remote output
    async fn send_output(&mut self, data: Bytes) -> Result<(), BridgeError>;

    /// One diagnostic text line (connection failures, authorization
    /// rejections) before the channel closes
    async fn send_diagnostic(&mut self, line: &str) -> Result<(), BridgeError>;

    /// Close the channel; idempotent and best-effort
    async fn close(&mut self);
}

/// Inbound half of the duplex channel
#[async_trait]
pub trait DuplexSource: Send {
    /// Next inbound message payload; `None` once the peer has closed
    async fn next_message(&mut self) -> Option<String>;
}
