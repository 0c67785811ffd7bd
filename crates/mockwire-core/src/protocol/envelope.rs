//! Bridge envelope (JSON).
//!
//! Outbound: `{ "id": 7, "method": "handleRequest", "data": {...} }`
//! Inbound:  `{ "id": 7, "success": true, "data": {...} }`
//!
//! A responder echoes the request id verbatim in exactly one reply.

use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MockWireError, Result};

/// Correlation id. Zero is not representable, so a decoded frame with
/// `"id": 0` is rejected at the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(NonZeroU64);

impl RequestId {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub const fn from_nonzero(v: NonZeroU64) -> Self {
        Self(v)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound call envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub id: RequestId,
    pub method: String,
    /// Method payload; absent payloads decode as `null`.
    #[serde(default)]
    pub data: Value,
}

/// Reply envelope. On failure `data` carries the error message string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reply {
    pub id: RequestId,
    pub success: bool,
    #[serde(default)]
    pub data: Value,
}

impl Reply {
    pub fn ok(id: RequestId, data: Value) -> Self {
        Self { id, success: true, data }
    }

    pub fn err(id: RequestId, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            data: Value::String(message.into()),
        }
    }

    /// Reply for a failed handler. Only the message crosses the hop.
    pub fn from_error(id: RequestId, err: &MockWireError) -> Self {
        Self::err(id, err.to_string())
    }

    /// Settle the reply into the caller-side result.
    ///
    /// The method-not-found message is recognised so its error code survives
    /// the hop; every other rejection becomes `MockWireError::Handler`.
    pub fn into_result(self) -> Result<Value> {
        if self.success {
            return Ok(self.data);
        }
        let message = match self.data {
            Value::String(s) => s,
            Value::Null => "invoke error".to_string(),
            other => other.to_string(),
        };
        Err(rejection(message))
    }
}

fn rejection(message: String) -> MockWireError {
    let method = message
        .strip_prefix("not method ")
        .and_then(|rest| rest.strip_suffix(" found"));
    match method {
        Some(m) if !m.is_empty() && !m.contains(' ') => MockWireError::MethodNotFound(m.to_string()),
        _ => MockWireError::Handler(message),
    }
}

/// Anything that travels on a bridge link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Frame {
    Request(Request),
    Reply(Reply),
}

impl Frame {
    pub fn id(&self) -> RequestId {
        match self {
            Frame::Request(r) => r.id,
            Frame::Reply(r) => r.id,
        }
    }
}

impl From<Request> for Frame {
    fn from(r: Request) -> Self {
        Frame::Request(r)
    }
}

impl From<Reply> for Frame {
    fn from(r: Reply) -> Self {
        Frame::Reply(r)
    }
}

/// Decode one text frame.
pub fn decode_frame(text: &str) -> Result<Frame> {
    serde_json::from_str(text)
        .map_err(|e| MockWireError::BadRequest(format!("invalid envelope json: {e}")))
}

/// Encode one frame as JSON text.
pub fn encode_frame(frame: &Frame) -> Result<String> {
    serde_json::to_string(frame)
        .map_err(|e| MockWireError::Internal(format!("envelope encode failed: {e}")))
}
