//! Error types for the wire client and simulator

use std::io;

use tagwatch_protocol::ProtocolError;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while talking to a listener or running the simulator
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the listener
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Read or write failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Listener closed the connection before replying
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// Reply line was neither ACK nor NACK
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Simulator needs more distinct tags
    #[error("simulator needs at least {min} tag ids, got {got}")]
    TooFewTags { min: usize, got: usize },

    /// Simulator options out of range
    #[error("invalid simulator option {field}: {message}")]
    InvalidOption {
        field: &'static str,
        message: String,
    },
}

impl ClientError {
    pub fn invalid_option(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidOption {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_too_few_tags() {
        let err = ClientError::TooFewTags { min: 3, got: 2 };
        assert_eq!(err.to_string(), "simulator needs at least 3 tag ids, got 2");
    }

    #[test]
    fn test_error_display_connect() {
        let err = ClientError::Connect {
            addr: "127.0.0.1:8888".into(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.to_string().contains("127.0.0.1:8888"));
    }

    #[test]
    fn test_error_display_invalid_option() {
        let err = ClientError::invalid_option("malformed_ratio", "must be within 0.0..=1.0");
        assert_eq!(
            err.to_string(),
            "invalid simulator option malformed_ratio: must be within 0.0..=1.0"
        );
    }

    #[test]
    fn test_protocol_error_passthrough() {
        let err = ClientError::from(ProtocolError::unexpected_response("HELLO"));
        assert!(err.to_string().contains("HELLO"));
    }
}
