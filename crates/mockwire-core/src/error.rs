//! Shared error type across mockwire crates.

use thiserror::Error;

/// Stable error codes (used in logs, metrics labels, and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed envelope or payload.
    BadRequest,
    /// Responder has no handler for the requested method.
    MethodNotFound,
    /// Remote handler failed; only its message crossed the hop.
    Handler,
    /// Message could not be handed to the transport.
    Transport,
    /// No reply arrived within the configured call timeout.
    Timeout,
    /// Path or domain pattern failed to compile.
    InvalidPattern,
    /// Rule body or script could not produce a response.
    InvalidRule,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::MethodNotFound => "METHOD_NOT_FOUND",
            ErrorCode::Handler => "HANDLER",
            ErrorCode::Transport => "TRANSPORT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InvalidPattern => "INVALID_PATTERN",
            ErrorCode::InvalidRule => "INVALID_RULE",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MockWireError>;

/// Unified error type used by core and bridge.
#[derive(Debug, Clone, Error)]
pub enum MockWireError {
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Display text is the exact rejection message sent back to callers.
    #[error("not method {0} found")]
    MethodNotFound(String),
    /// Rejection received from the far side of a hop (message only).
    #[error("{0}")]
    Handler(String),
    #[error("transport: {0}")]
    Transport(String),
    #[error("call timed out after {0}ms")]
    Timeout(u64),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("invalid rule: {0}")]
    InvalidRule(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl MockWireError {
    /// Map an error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MockWireError::BadRequest(_) => ErrorCode::BadRequest,
            MockWireError::MethodNotFound(_) => ErrorCode::MethodNotFound,
            MockWireError::Handler(_) => ErrorCode::Handler,
            MockWireError::Transport(_) => ErrorCode::Transport,
            MockWireError::Timeout(_) => ErrorCode::Timeout,
            MockWireError::InvalidPattern(_) => ErrorCode::InvalidPattern,
            MockWireError::InvalidRule(_) => ErrorCode::InvalidRule,
            MockWireError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            MockWireError::Internal(_) => ErrorCode::Internal,
        }
    }
}
