//! Error types for memkv
//!
//! Provides a unified error type for all operations, plus the parser's
//! own error type whose messages are sent back to clients verbatim.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for memkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Arguments parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Value by key={0} not found")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    /// A single read filled the whole buffer, so the frame may be truncated
    #[error("small buffer size: read {read} bytes into a {capacity} byte buffer")]
    BufferTooSmall { capacity: usize, read: usize },

    #[error("Connection deadline error: {0}")]
    Deadline(String),

    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    /// Handler failure; an empty message is reported to peers as "Internal error"
    #[error("{0}")]
    Internal(String),
}

impl KvError {
    /// Whether this error is an I/O timeout (read or write deadline expired)
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            KvError::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            )
        )
    }

    pub(crate) fn deadline(timeout: Duration, source: std::io::Error) -> Self {
        KvError::Deadline(format!("failed to set {:?} timeout: {}", timeout, source))
    }
}

/// Validation failures produced by the request parser
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected {} {}, got {}", .expected, arguments_noun(.expected), .got)]
    Arity { expected: usize, got: usize },

    #[error("Unknown command")]
    UnknownCommand(String),

    #[error("Unknown symbols in arguments")]
    UnknownSymbols,
}

fn arguments_noun(count: &usize) -> &'static str {
    if *count == 1 {
        "argument"
    } else {
        "arguments"
    }
}
