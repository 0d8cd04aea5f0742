//! Protocol error types
//!
//! Rejection reasons produced by the beacon parser and errors raised while
//! decoding acknowledgement lines.

use serde::Serialize;
use thiserror::Error;

/// Why a beacon line was rejected
///
/// Each reason is counted separately in [`crate::ParserStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Line does not have the `TAG,<id>,<cnt>,<timestamp>` shape at all
    #[error("malformed beacon: expected TAG,<tag_id>,<cnt>,<timestamp>")]
    Malformed,

    /// Counter field is not a non-negative decimal integer
    #[error("invalid counter")]
    InvalidCounter,

    /// Tag identifier does not match the configured id grammar
    #[error("invalid tag id")]
    InvalidTagId,

    /// Timestamp does not match the configured timestamp grammar
    #[error("invalid timestamp")]
    InvalidTimestamp,
}

impl RejectReason {
    /// Stable machine-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::InvalidCounter => "invalid_counter",
            Self::InvalidTagId => "invalid_tag_id",
            Self::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

/// Errors that can occur while handling protocol messages
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Beacon rejected by the parser
    #[error(transparent)]
    Rejected(#[from] RejectReason),

    /// Response line is neither ACK nor NACK
    #[error("unexpected response line: {0:?}")]
    UnexpectedResponse(String),

    /// Unknown parser mode name
    #[error("unknown parse mode: {0}")]
    UnknownMode(String),
}

impl ProtocolError {
    /// Create an unexpected response error
    #[inline]
    pub fn unexpected_response(line: impl Into<String>) -> Self {
        Self::UnexpectedResponse(line.into())
    }
}
