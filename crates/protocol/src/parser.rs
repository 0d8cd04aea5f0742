//! Beacon parser
//!
//! Classifies a single raw line as a [`Beacon`] or a [`RejectReason`].
//!
//! # Grammar
//!
//! ```text
//! TAG,<tag_id>,<cnt>,<timestamp>
//! ```
//!
//! | Field | Strict | Permissive |
//! |-------|--------|------------|
//! | `tag_id` | `[a-fA-F0-9]{8,16}` | `[a-zA-Z0-9]{4,32}` |
//! | `cnt` | decimal digits, fits `u64` | same |
//! | `timestamp` | `YYYYMMDDHHMMSS.mmm`, valid calendar date/time | any non-empty string |
//!
//! Checks run in the order counter, tag id, timestamp; the first failing check
//! decides the reason.
//!
//! The parser does no I/O. Its only mutable state is a set of atomic counters,
//! so one instance can be shared by every connection.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::beacon::Beacon;
use crate::error::{ProtocolError, RejectReason};

/// Top-level shape: prefix plus exactly three non-empty comma-free fields
static LINE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^TAG,([^,]+),([^,]+),([^,]+)$").expect("valid line pattern"));

static COUNTER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid counter pattern"));

static STRICT_TAG_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-fA-F0-9]{8,16}$").expect("valid strict tag id pattern"));

static PERMISSIVE_TAG_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]{4,32}$").expect("valid permissive tag id pattern"));

static STRICT_TIMESTAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{14}\.[0-9]{3}$").expect("valid timestamp pattern"));

/// Validation strictness, fixed when the parser is built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// Hex tag ids and `YYYYMMDDHHMMSS.mmm` timestamps (default)
    #[default]
    Strict,
    /// Alphanumeric tag ids and free-form timestamps
    #[serde(alias = "flexible")]
    Permissive,
}

impl ParseMode {
    /// Mode name as used in configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Permissive => "permissive",
        }
    }
}

impl FromStr for ParseMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" | "flexible" => Ok(Self::Permissive),
            other => Err(ProtocolError::UnknownMode(other.to_string())),
        }
    }
}

/// Running parse counters
#[derive(Debug, Default)]
struct Counters {
    total: AtomicU64,
    successful: AtomicU64,
    malformed: AtomicU64,
    invalid_counter: AtomicU64,
    invalid_tag_id: AtomicU64,
    invalid_timestamp: AtomicU64,
}

impl Counters {
    #[inline]
    fn rejected(&self, reason: RejectReason) {
        let counter = match reason {
            RejectReason::Malformed => &self.malformed,
            RejectReason::InvalidCounter => &self.invalid_counter,
            RejectReason::InvalidTagId => &self.invalid_tag_id,
            RejectReason::InvalidTimestamp => &self.invalid_timestamp,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        for counter in [
            &self.total,
            &self.successful,
            &self.malformed,
            &self.invalid_counter,
            &self.invalid_tag_id,
            &self.invalid_timestamp,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time snapshot of parser counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ParserStats {
    /// Lines submitted to the parser
    pub total: u64,
    /// Lines accepted
    pub successful: u64,
    /// Lines rejected for any reason
    pub failed: u64,
    /// Rejected: wrong overall shape
    pub malformed: u64,
    /// Rejected: bad counter
    pub invalid_counter: u64,
    /// Rejected: bad tag id
    pub invalid_tag_id: u64,
    /// Rejected: bad timestamp
    pub invalid_timestamp: u64,
    /// `successful / total`, 0.0 before the first line
    pub success_rate: f64,
}

/// Thread-safe beacon parser
#[derive(Debug, Default)]
pub struct BeaconParser {
    mode: ParseMode,
    counters: Counters,
}

impl BeaconParser {
    /// Create a parser for the given mode
    pub fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            counters: Counters::default(),
        }
    }

    /// Parser in strict mode
    pub fn strict() -> Self {
        Self::new(ParseMode::Strict)
    }

    /// Parser in permissive mode
    pub fn permissive() -> Self {
        Self::new(ParseMode::Permissive)
    }

    /// Configured mode
    pub fn mode(&self) -> ParseMode {
        self.mode
    }

    /// Parse one line
    ///
    /// Leading and trailing whitespace is stripped before matching.
    pub fn parse(&self, raw: &str) -> Result<Beacon, RejectReason> {
        let line = raw.trim();
        self.counters.total.fetch_add(1, Ordering::Relaxed);

        match self.classify(line) {
            Ok(beacon) => {
                self.counters.successful.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(%beacon, "beacon parsed");
                Ok(beacon)
            }
            Err(reason) => {
                self.counters.rejected(reason);
                tracing::debug!(line = %line, reason = reason.as_str(), "beacon rejected");
                Err(reason)
            }
        }
    }

    /// Parse several lines, returning accepted beacons and rejected raw lines
    pub fn parse_batch<I, S>(&self, lines: I) -> (Vec<Beacon>, Vec<String>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for line in lines {
            let line = line.as_ref();
            match self.parse(line) {
                Ok(beacon) => accepted.push(beacon),
                Err(_) => rejected.push(line.to_string()),
            }
        }

        tracing::debug!(
            accepted = accepted.len(),
            rejected = rejected.len(),
            "batch parsed"
        );
        (accepted, rejected)
    }

    /// Snapshot of the running counters
    pub fn stats(&self) -> ParserStats {
        let c = &self.counters;
        let total = c.total.load(Ordering::Relaxed);
        let successful = c.successful.load(Ordering::Relaxed);
        let malformed = c.malformed.load(Ordering::Relaxed);
        let invalid_counter = c.invalid_counter.load(Ordering::Relaxed);
        let invalid_tag_id = c.invalid_tag_id.load(Ordering::Relaxed);
        let invalid_timestamp = c.invalid_timestamp.load(Ordering::Relaxed);

        let success_rate = if total > 0 {
            successful as f64 / total as f64
        } else {
            0.0
        };

        ParserStats {
            total,
            successful,
            failed: malformed + invalid_counter + invalid_tag_id + invalid_timestamp,
            malformed,
            invalid_counter,
            invalid_tag_id,
            invalid_timestamp,
            success_rate,
        }
    }

    /// Zero every counter
    pub fn reset_stats(&self) {
        self.counters.reset();
        tracing::info!("parser statistics reset");
    }

    fn classify(&self, line: &str) -> Result<Beacon, RejectReason> {
        let caps = LINE_PATTERN.captures(line).ok_or(RejectReason::Malformed)?;
        let (tag_id, cnt, timestamp) = (&caps[1], &caps[2], &caps[3]);

        let cnt = parse_counter(cnt)?;

        if !self.valid_tag_id(tag_id) {
            return Err(RejectReason::InvalidTagId);
        }

        if !self.valid_timestamp(timestamp) {
            return Err(RejectReason::InvalidTimestamp);
        }

        Ok(Beacon {
            tag_id: tag_id.to_string(),
            cnt,
            timestamp: timestamp.to_string(),
            raw: line.to_string(),
            parsed_at: Utc::now(),
        })
    }

    fn valid_tag_id(&self, tag_id: &str) -> bool {
        match self.mode {
            ParseMode::Strict => STRICT_TAG_ID.is_match(tag_id),
            ParseMode::Permissive => PERMISSIVE_TAG_ID.is_match(tag_id),
        }
    }

    fn valid_timestamp(&self, timestamp: &str) -> bool {
        match self.mode {
            ParseMode::Strict => {
                STRICT_TIMESTAMP.is_match(timestamp) && valid_calendar_time(&timestamp[..14])
            }
            ParseMode::Permissive => !timestamp.trim().is_empty(),
        }
    }
}

/// Digits only, within `u64`
fn parse_counter(s: &str) -> Result<u64, RejectReason> {
    if !COUNTER_PATTERN.is_match(s) {
        return Err(RejectReason::InvalidCounter);
    }
    s.parse::<u64>().map_err(|_| RejectReason::InvalidCounter)
}

/// `YYYYMMDDHHMMSS` names a real date and time of day
///
/// Years run from 0001; the proleptic year 0 is rejected.
/// Caller guarantees 14 ASCII digits.
fn valid_calendar_time(digits: &str) -> bool {
    let field = |range: std::ops::Range<usize>| digits[range].parse::<u32>().ok();

    let (Some(year), Some(month), Some(day), Some(hour), Some(minute), Some(second)) = (
        field(0..4),
        field(4..6),
        field(6..8),
        field(8..10),
        field(10..12),
        field(12..14),
    ) else {
        return false;
    };
    if year == 0 {
        return false;
    }

    NaiveDate::from_ymd_opt(year as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .is_some()
}
