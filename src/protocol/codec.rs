//! Line codec for JSON-RPC envelopes.
//!
//! Decoding validates the envelope shape before any typed parsing so a
//! malformed frame is reported as `InvalidRequest` rather than a generic
//! parse failure.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::types::{JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, Message};
use serde_json::Value;
use tracing::trace;

/// Default upper bound for a single frame.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Encodes and decodes one envelope per frame.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    max_message_bytes: usize,
}

impl Codec {
    pub fn new(max_message_bytes: usize) -> Self {
        Self { max_message_bytes }
    }

    pub fn max_message_bytes(&self) -> usize {
        self.max_message_bytes
    }

    /// Decode a single frame.
    pub fn decode(&self, frame: &str) -> ProtocolResult<Message> {
        if frame.len() > self.max_message_bytes {
            return Err(ProtocolError::InvalidRequest(
                format!(
                    "message of {} bytes exceeds limit of {} bytes",
                    frame.len(),
                    self.max_message_bytes
                )
                .into(),
            ));
        }

        let value: Value = serde_json::from_str(frame).map_err(|_| ProtocolError::ParseError)?;
        trace!("Decoded frame: {}", frame);
        decode_value(value)
    }

    /// Encode a message as a single line (no trailing newline).
    pub fn encode(&self, message: &Message) -> ProtocolResult<String> {
        serde_json::to_string(message)
            .map_err(|e| ProtocolError::InternalError(e.to_string().into()))
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_BYTES)
    }
}

/// Classify an already parsed JSON value as request, notification or response.
pub fn decode_value(value: Value) -> ProtocolResult<Message> {
    let Value::Object(ref object) = value else {
        return Err(ProtocolError::InvalidRequest(
            "envelope must be a JSON object".into(),
        ));
    };

    match object.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => {}
        Some(other) => {
            return Err(ProtocolError::InvalidRequest(
                format!("unsupported jsonrpc version '{other}'").into(),
            ));
        }
        None => {
            return Err(ProtocolError::InvalidRequest(
                "missing jsonrpc version tag".into(),
            ));
        }
    }

    if object.contains_key("method") {
        let request: JsonRpcRequest = serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string().into()))?;
        return Ok(Message::Request(request));
    }

    if object.contains_key("result") || object.contains_key("error") {
        let response: JsonRpcResponse = serde_json::from_value(value)
            .map_err(|e| ProtocolError::InvalidRequest(e.to_string().into()))?;
        return Ok(Message::Response(response));
    }

    Err(ProtocolError::InvalidRequest(
        "envelope has neither method nor result/error".into(),
    ))
}

/// Best-effort extraction of a request id from a frame that failed to decode,
/// so the error response can still be correlated.
pub fn salvage_id(frame: &str) -> Option<crate::protocol::types::RequestId> {
    let value: Value = serde_json::from_str(frame).ok()?;
    serde_json::from_value(value.get("id")?.clone()).ok()
}
