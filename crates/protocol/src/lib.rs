//! Tagwatch protocol - beacon line format
//!
//! This crate provides the types shared by every tagwatch component:
//! - `Beacon` - A validated `TAG,<id>,<cnt>,<timestamp>` record
//! - `BeaconParser` - Thread-safe line classifier with running counters
//! - `ParseMode` - Strict (hex ids, calendar timestamps) or permissive
//! - `Ack` - The one-line `ACK`/`NACK` reply sent for every beacon
//!
//! The parser performs no I/O and holds no locks, so a single instance is
//! shared by all listener connections and the HTTP facade.

mod beacon;
mod error;
mod parser;
mod wire;

pub use beacon::{BEACON_PREFIX, Beacon, format_line};
pub use error::{ProtocolError, RejectReason};
pub use parser::{BeaconParser, ParseMode, ParserStats};
pub use wire::{ACK, Ack, NACK};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Default maximum beacon line length in bytes, terminator excluded
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024;

/// Timestamp layout emitted by well-behaved tags (`YYYYMMDDHHMMSS.mmm`)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%.3f";

#[cfg(test)]
mod parser_test;
