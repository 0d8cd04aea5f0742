//! Tag registration models
//!
//! A tag must be registered before its beacons are recorded. Registrations
//! are immutable and never deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredTag {
    pub id: String,
    pub description: String,
    pub registered_at: DateTime<Utc>,
}

/// Derived observation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagStatus {
    /// Registered, no beacon recorded yet
    #[default]
    Registered,
    /// At least one beacon recorded
    Active,
}

impl TagStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Active => "active",
        }
    }
}

/// Registration joined with last-known state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagView {
    pub id: String,
    pub description: String,
    pub registered_at: DateTime<Utc>,
    /// Counter of the last applied beacon
    pub last_cnt: Option<u64>,
    /// Device timestamp of the last applied beacon
    pub last_seen: Option<String>,
    /// Number of changes applied, 0 until the first beacon
    pub total_updates: u64,
    pub status: TagStatus,
}

impl TagView {
    /// Whether any beacon has been recorded for this tag
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == TagStatus::Active
    }
}
