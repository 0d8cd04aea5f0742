//! Beacon record
//!
//! A validated telemetry line emitted by a tag.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Wire prefix of every beacon line
pub const BEACON_PREFIX: &str = "TAG";

/// A parsed and validated beacon
///
/// # Example
///
/// ```
/// use tagwatch_protocol::{BeaconParser, ParseMode};
///
/// let parser = BeaconParser::new(ParseMode::Strict);
/// let beacon = parser.parse("TAG,fa451f0755d8,197,20251003140059.456").unwrap();
/// assert_eq!(beacon.tag_id, "fa451f0755d8");
/// assert_eq!(beacon.cnt, 197);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Beacon {
    /// Tag identifier
    pub tag_id: String,
    /// Device counter
    pub cnt: u64,
    /// Device timestamp, kept as sent
    pub timestamp: String,
    /// The trimmed input line
    pub raw: String,
    /// When the line was parsed
    pub parsed_at: DateTime<Utc>,
}

impl Beacon {
    /// Render the beacon back into its wire form (without newline)
    pub fn to_line(&self) -> String {
        format_line(&self.tag_id, self.cnt, &self.timestamp)
    }
}

impl fmt::Display for Beacon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Beacon(id={}, cnt={}, ts={})",
            self.tag_id, self.cnt, self.timestamp
        )
    }
}

/// Format a beacon line from its parts
#[inline]
pub fn format_line(tag_id: &str, cnt: u64, timestamp: &str) -> String {
    format!("{BEACON_PREFIX},{tag_id},{cnt},{timestamp}")
}
