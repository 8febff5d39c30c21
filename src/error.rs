//! Errors raised by the ring link, the token engine and node configuration.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by a ring node.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RingError {
    /// Read or write failure on one of the ring streams.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Every dial attempt to the next node failed.
    #[error("failed to connect to {address} after {attempts} attempts (backoff {backoff:?})")]
    DialExhausted {
        address: String,
        attempts: u32,
        backoff: Duration,
    },

    /// The previous node closed the inbound stream.
    #[error("previous node closed the connection")]
    PeerClosed,

    /// The ring link was closed and cannot be reopened.
    #[error("ring link is closed")]
    Closed,

    /// Invalid node configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration could not be parsed.
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl RingError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RingError::Io(_) => "ring_io",
            RingError::DialExhausted { .. } => "ring_dial_exhausted",
            RingError::PeerClosed => "ring_peer_closed",
            RingError::Closed => "ring_closed",
            RingError::Config(_) => "ring_config",
            RingError::Json(_) => "ring_config_json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        assert_eq!(RingError::PeerClosed.as_label(), "ring_peer_closed");
        let err = RingError::DialExhausted {
            address: "127.0.0.1:1".into(),
            attempts: 5,
            backoff: Duration::from_secs(2),
        };
        assert_eq!(err.as_label(), "ring_dial_exhausted");
        assert!(err.to_string().contains("after 5 attempts"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: RingError = io.into();
        assert_eq!(err.as_label(), "ring_io");
    }
}
