//! Workspace-wide error type.
//!
//! One variant per error kind in the specification's error handling design:
//! transport/handshake failures, protocol-level JSON-RPC errors, per-request
//! timeouts, auth configuration rejection, rule compilation failures,
//! validation errors, scan cancellation, and the busy-scan guard.

use thiserror::Error;

/// Result type alias used throughout the inspector crates.
pub type Result<T> = std::result::Result<T, Error>;

/// A JSON-RPC error returned by the server (any code other than
/// `-32601 method not found`, which is handled as a graceful degradation
/// at the enumeration boundary rather than surfaced as an error).
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolErrorDetail {
    /// JSON-RPC error code.
    pub code: i64,
    /// JSON-RPC error message.
    pub message: String,
}

/// The stage at which a connection attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    /// DNS resolution failed.
    Dns,
    /// TCP connection failed.
    Tcp,
    /// TLS handshake failed.
    Tls,
    /// The SSE transport never received an endpoint announcement in time.
    SseEndpointAnnounce,
    /// The `initialize` handshake failed or timed out.
    Initialize,
}

impl std::fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Dns => "dns",
            Self::Tcp => "tcp",
            Self::Tls => "tls",
            Self::SseEndpointAnnounce => "sse_endpoint_announce",
            Self::Initialize => "initialize",
        };
        f.write_str(s)
    }
}

/// Errors produced by the transport, protocol, detection, and scan layers.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A transport-level failure (connection refused, stream closed, etc).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server returned a JSON-RPC error other than `-32601`.
    #[error("protocol error {}: {}", .0.code, .0.message)]
    Protocol(ProtocolErrorDetail),

    /// A request exceeded its per-call timeout budget.
    #[error("request timed out")]
    Timeout,

    /// The connection attempt failed during the named stage.
    #[error("connection failed at stage {stage}: {detail}")]
    Connect {
        /// Stage at which the connection failed.
        stage: ConnectStage,
        /// Human-readable detail.
        detail: String,
    },

    /// The auth configuration was rejected (e.g. non-ISO-8859-1 header content).
    #[error("invalid auth configuration: {0}")]
    InvalidAuth(String),

    /// A detection rule's pattern failed to compile.
    #[error("rule compilation failed: {0}")]
    RuleCompilation(String),

    /// A user-authored rule or configuration value failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation was cancelled via a cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// A scan was requested while another scan is already active on this connection.
    #[error("a scan is already active for this connection")]
    Busy,

    /// Connection was torn down; all pending requests are failed with this.
    #[error("connection closed")]
    ConnectionClosed,

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Construct a `Connect` error for the given stage.
    pub fn connect(stage: ConnectStage, detail: impl Into<String>) -> Self {
        Self::Connect {
            stage,
            detail: detail.into(),
        }
    }

    /// Construct a `Protocol` error from a JSON-RPC error code and message.
    pub fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol(ProtocolErrorDetail {
            code,
            message: message.into(),
        })
    }

    /// JSON-RPC error code reserved for "method not found" — callers at the
    /// enumeration boundary treat this as an empty result, not an `Error`.
    pub const METHOD_NOT_FOUND: i64 = -32601;
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Self::RuleCompilation(err.to_string())
    }
}
