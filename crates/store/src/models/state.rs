//! Tag state and history models

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Last-known state of an observed tag
///
/// Exists only for registered tags that received at least one beacon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagState {
    pub tag_id: String,
    pub last_cnt: u64,
    pub last_timestamp: String,
    /// Device timestamp of the first recorded beacon
    pub first_seen: String,
    /// Starts at 1, incremented on every counter change
    pub total_updates: u64,
    pub created_at: DateTime<Utc>,
}

/// One accepted beacon, appended whether or not it changed the state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryRecord {
    pub tag_id: String,
    pub cnt: u64,
    pub timestamp: String,
    /// Store clock at ingestion
    pub received_at: DateTime<Utc>,
}

/// Row counts across the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub registered_tags: u64,
    /// Tags with a recorded state
    pub active_tags: u64,
    pub history_records: u64,
}
