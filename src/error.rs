//! Domain-specific error types for the screenlink transport.
//!
//! All fallible operations return `Result<T, LinkError>`.
//! No panics on invalid input — every error is typed.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the screenlink transport.
#[derive(Debug, Error)]
pub enum LinkError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// A frame header declared a zero-byte payload.
    #[error("empty frame: payload size must be non-zero")]
    EmptyFrame,

    /// A frame header declared a payload beyond the configured bound.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// A framing invariant was violated.
    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// Dialing the remote side exceeded the connect deadline.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    // ── Codec Capability Errors ──────────────────────────────────
    /// The codec capability reported a failure.
    #[error("codec error: {0}")]
    Codec(String),

    // ── Termination ──────────────────────────────────────────────
    /// The byte stream ended. This is the normal termination signal
    /// for a pump, not a fault.
    #[error("stream closed by peer")]
    StreamClosed,

    /// A spawned pump task failed to complete.
    #[error("pump task failed: {0}")]
    Task(String),
}

impl LinkError {
    /// Whether this error represents an ordinary end of session
    /// rather than a fault. End-of-stream and broken-pipe conditions
    /// are how a peer hangup surfaces inside a blocked read or write.
    pub fn is_clean_shutdown(&self) -> bool {
        use std::io::ErrorKind;
        match self {
            LinkError::StreamClosed => true,
            LinkError::Connection(e) => matches!(
                e.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = LinkError::FrameTooLarge {
            size: 3_000_000,
            max: 2 * 1024 * 1024,
        };
        assert!(e.to_string().contains("3000000"));

        let e = LinkError::EmptyFrame;
        assert!(e.to_string().contains("non-zero"));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: LinkError = io_err.into();
        assert!(matches!(e, LinkError::Connection(_)));
    }

    #[test]
    fn stream_closed_is_clean() {
        assert!(LinkError::StreamClosed.is_clean_shutdown());
        assert!(!LinkError::EmptyFrame.is_clean_shutdown());

        let broken: LinkError =
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone").into();
        assert!(broken.is_clean_shutdown());

        let refused: LinkError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "no").into();
        assert!(!refused.is_clean_shutdown());
    }
}
