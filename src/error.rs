//! Error types for ramwire.

use thiserror::Error;

/// Main error type for all ramwire operations.
#[derive(Debug, Error)]
pub enum RamwireError {
    /// I/O error during socket operations (reset, refused, bind failure).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Payload could not be decoded into a RAM frame.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Peer closed the connection part way through a message.
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead {
        /// Bytes needed to complete the prefix or payload.
        expected: usize,
        /// Bytes actually buffered when the peer closed.
        received: usize,
    },

    /// Declared payload length exceeds the configured maximum.
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge {
        /// Length declared by the prefix.
        size: u64,
        /// Configured maximum.
        max: u64,
    },

    /// A frame or change callback failed.
    #[error("Handler failed: {0}")]
    Handler(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation requires a running listener.
    #[error("Listener is not running")]
    NotRunning,

    /// `start()` was called on a listener that is already running.
    #[error("Listener is already running")]
    AlreadyRunning,
}

impl RamwireError {
    /// Build a handler failure from any displayable error.
    pub fn handler(err: impl std::fmt::Display) -> Self {
        Self::Handler(err.to_string())
    }

    /// Whether this error only affects a single connection.
    ///
    /// Connection-scoped errors end that connection's reader task and
    /// never reach the accept loop.
    pub fn is_connection_scoped(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::MalformedFrame(_)
                | Self::ShortRead { .. }
                | Self::PayloadTooLarge { .. }
        )
    }
}

/// Result type alias using RamwireError.
pub type Result<T> = std::result::Result<T, RamwireError>;
