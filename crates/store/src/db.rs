//! Database connection and schema management
//!
//! Uses Turso (async SQLite-compatible) as the backing engine.
//!
//! # Concurrency
//!
//! Every mutation takes the store-wide lock exclusively and runs inside one
//! SQL transaction. Two `ingest` calls therefore never observe the same
//! `last_cnt`, whichever connection they come from. Reads take the lock
//! shared: they run alongside each other but never overlap a mutation, so
//! the engine never sees a reader holding the database while a writer
//! commits.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};
use turso::{Builder, Connection, Database};

use crate::error::{Result, StoreError};

/// Tag state store
///
/// Constructed explicitly by the process and shared behind an `Arc`.
pub struct TagStore {
    db: Database,
    lock: RwLock<()>,
    location: String,
}

impl TagStore {
    /// Open (or create) a file-backed store
    ///
    /// Missing parent directories are created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let location = path
            .to_str()
            .ok_or_else(|| StoreError::invalid("path", "database path must be valid UTF-8"))?
            .to_string();

        info!(path = %location, "opening tag store");
        let db = Builder::new_local(&location).build().await?;

        Self::init(db, location).await
    }

    /// Create an in-memory store (for testing)
    pub async fn new_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::init(db, ":memory:".to_string()).await
    }

    async fn init(db: Database, location: String) -> Result<Self> {
        let store = Self {
            db,
            lock: RwLock::new(()),
            location,
        };
        store.init_schema().await?;
        Ok(store)
    }

    /// Database file path, or `:memory:`
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Check the database answers a trivial query
    pub async fn ping(&self) -> Result<()> {
        let _guard = self.read_lock().await;
        let conn = self.connect()?;
        let mut rows = conn.query("SELECT 1", ()).await?;
        rows.next().await?;
        Ok(())
    }

    /// New connection
    ///
    /// Callers hold [`read_lock`](Self::read_lock) or
    /// [`write_lock`](Self::write_lock) for as long as the connection is in use,
    /// and declare the guard first so the connection is dropped before it.
    pub(crate) fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    /// Shared access for a read
    pub(crate) async fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.lock.read().await
    }

    /// Exclusive access for a mutation
    pub(crate) async fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write().await
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(SCHEMA_REGISTERED_TAGS, ()).await?;
        conn.execute(SCHEMA_TAG_STATES, ()).await?;
        conn.execute(SCHEMA_TAG_HISTORY, ()).await?;

        conn.execute(INDEX_HISTORY_TAG, ()).await?;
        conn.execute(INDEX_HISTORY_RECEIVED, ()).await?;

        debug!(location = %self.location, "tag store schema initialized");
        Ok(())
    }
}

// =============================================================================
// Transactions
// =============================================================================

pub(crate) async fn begin(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN", ()).await?;
    Ok(())
}

/// Commit, rolling back if the commit itself fails
pub(crate) async fn commit(conn: &Connection) -> Result<()> {
    if let Err(e) = conn.execute("COMMIT", ()).await {
        rollback(conn).await;
        return Err(e.into());
    }
    Ok(())
}

pub(crate) async fn rollback(conn: &Connection) {
    if let Err(e) = conn.execute("ROLLBACK", ()).await {
        warn!(error = %e, "rollback failed");
    }
}

// =============================================================================
// Row decoding
// =============================================================================

/// Store clock in a fixed-width, lexically sortable form
pub(crate) fn now_string() -> String {
    format_instant(&Utc::now())
}

pub(crate) fn format_instant(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn text(row: &turso::Row, idx: usize) -> Result<String> {
    Ok(row.get_value(idx)?.as_text().cloned().unwrap_or_default())
}

pub(crate) fn optional_text(row: &turso::Row, idx: usize) -> Result<Option<String>> {
    Ok(row.get_value(idx)?.as_text().cloned())
}

pub(crate) fn integer(row: &turso::Row, idx: usize) -> Result<i64> {
    Ok(row.get_value(idx)?.as_integer().copied().unwrap_or(0))
}

/// Non-negative count column
pub(crate) fn count(row: &turso::Row, idx: usize) -> Result<u64> {
    let value = integer(row, idx)?;
    u64::try_from(value).map_err(|_| StoreError::corrupt("count", value.to_string()))
}

/// Counters are stored as decimal text so the full `u64` range survives
pub(crate) fn parse_cnt(column: &'static str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| StoreError::corrupt(column, value))
}

pub(crate) fn parse_instant(column: &'static str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::corrupt(column, value))
}

// =============================================================================
// Schema
// =============================================================================

const SCHEMA_REGISTERED_TAGS: &str = r#"
CREATE TABLE IF NOT EXISTS registered_tags (
    id TEXT PRIMARY KEY,
    description TEXT NOT NULL DEFAULT '',
    registered_at TEXT NOT NULL
)
"#;

const SCHEMA_TAG_STATES: &str = r#"
CREATE TABLE IF NOT EXISTS tag_states (
    tag_id TEXT PRIMARY KEY,
    last_cnt TEXT NOT NULL,
    last_timestamp TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    total_updates INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    FOREIGN KEY (tag_id) REFERENCES registered_tags(id)
)
"#;

const SCHEMA_TAG_HISTORY: &str = r#"
CREATE TABLE IF NOT EXISTS tag_history (
    id INTEGER PRIMARY KEY,
    tag_id TEXT NOT NULL,
    cnt TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    received_at TEXT NOT NULL,
    FOREIGN KEY (tag_id) REFERENCES registered_tags(id)
)
"#;

const INDEX_HISTORY_TAG: &str =
    "CREATE INDEX IF NOT EXISTS idx_tag_history_tag_id ON tag_history(tag_id)";

const INDEX_HISTORY_RECEIVED: &str =
    "CREATE INDEX IF NOT EXISTS idx_tag_history_received_at ON tag_history(received_at)";
