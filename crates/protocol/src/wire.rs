//! Acknowledgement lines
//!
//! Every newline-terminated beacon a client sends is answered with exactly one
//! line: `ACK` when the parser accepted it, `NACK` otherwise.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ProtocolError;

/// Positive acknowledgement, newline included
pub const ACK: &[u8] = b"ACK\n";

/// Negative acknowledgement, newline included
pub const NACK: &[u8] = b"NACK\n";

/// Decoded acknowledgement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Ack {
    Ack,
    Nack,
}

impl Ack {
    /// Build from a parse outcome
    #[inline]
    pub fn from_accepted(accepted: bool) -> Self {
        if accepted { Self::Ack } else { Self::Nack }
    }

    /// Wire bytes including the terminating newline
    #[inline]
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Ack => ACK,
            Self::Nack => NACK,
        }
    }

    #[inline]
    pub fn is_ack(&self) -> bool {
        matches!(self, Self::Ack)
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => f.write_str("ACK"),
            Self::Nack => f.write_str("NACK"),
        }
    }
}

impl FromStr for Ack {
    type Err = ProtocolError;

    /// Accepts the line with or without its trailing newline
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end_matches(['\r', '\n']) {
            "ACK" => Ok(Self::Ack),
            "NACK" => Ok(Self::Nack),
            other => Err(ProtocolError::unexpected_response(other)),
        }
    }
}
