//! Beacon ingestion
//!
//! The only writer of `tag_states` and `tag_history`.

use tracing::{debug, info, warn};
use turso::Connection;

use crate::TagStore;
use crate::db::{self, begin, commit, rollback};
use crate::error::Result;
use crate::registry::registration_exists;

/// What a beacon did to the store, decided inside one critical section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// No registration; nothing written
    Unregistered,
    /// First beacon of the tag; state created
    FirstSeen,
    /// Counter differs from `previous`; state updated
    Changed { previous: u64 },
    /// Same counter as before; history only
    Unchanged,
}

impl IngestOutcome {
    /// Whether the tag's counter changed
    pub fn changed(&self) -> bool {
        matches!(self, Self::FirstSeen | Self::Changed { .. })
    }

    pub fn is_registered(&self) -> bool {
        !matches!(self, Self::Unregistered)
    }
}

impl TagStore {
    /// Record a beacon, returning whether it changed the tag's counter
    ///
    /// Beacons for unregistered tags are dropped and return `false`. For a
    /// registered tag a history row is always appended; the state is created
    /// on the first beacon and updated whenever `cnt` differs from the last
    /// recorded value, in either direction.
    pub async fn ingest(&self, tag_id: &str, cnt: u64, timestamp: &str) -> Result<bool> {
        Ok(self.ingest_outcome(tag_id, cnt, timestamp).await?.changed())
    }

    /// [`ingest`](Self::ingest), reporting what happened instead of a flag
    pub async fn ingest_outcome(
        &self,
        tag_id: &str,
        cnt: u64,
        timestamp: &str,
    ) -> Result<IngestOutcome> {
        let _guard = self.write_lock().await;
        let conn = self.connect()?;
        begin(&conn).await?;

        let applied = match apply(&conn, tag_id, cnt, timestamp).await {
            Ok(applied) => applied,
            Err(e) => {
                rollback(&conn).await;
                return Err(e);
            }
        };

        if applied == IngestOutcome::Unregistered {
            rollback(&conn).await;
            warn!(tag_id, cnt, "beacon for unregistered tag dropped");
            return Ok(applied);
        }

        commit(&conn).await?;

        match applied {
            IngestOutcome::FirstSeen => info!(tag_id, cnt, timestamp, "tag first seen"),
            IngestOutcome::Changed { previous } => {
                if cnt < previous {
                    debug!(tag_id, previous, cnt, "counter decreased");
                }
                info!(tag_id, previous, cnt, timestamp, "counter changed");
            }
            IngestOutcome::Unchanged => debug!(tag_id, cnt, "counter unchanged"),
            IngestOutcome::Unregistered => {}
        }
        Ok(applied)
    }
}

/// Runs inside the caller's transaction
async fn apply(
    conn: &Connection,
    tag_id: &str,
    cnt: u64,
    timestamp: &str,
) -> Result<IngestOutcome> {
    if !registration_exists(conn, tag_id).await? {
        return Ok(IngestOutcome::Unregistered);
    }

    let now = db::now_string();
    let cnt_text = cnt.to_string();

    conn.execute(
        "INSERT INTO tag_history (tag_id, cnt, timestamp, received_at) VALUES (?1, ?2, ?3, ?4)",
        [tag_id, cnt_text.as_str(), timestamp, now.as_str()],
    )
    .await?;

    let previous = last_cnt(conn, tag_id).await?;

    match previous {
        None => {
            conn.execute(
                r#"
                INSERT INTO tag_states (tag_id, last_cnt, last_timestamp, first_seen, total_updates, created_at)
                VALUES (?1, ?2, ?3, ?4, 1, ?5)
                "#,
                [tag_id, cnt_text.as_str(), timestamp, timestamp, now.as_str()],
            )
            .await?;
            Ok(IngestOutcome::FirstSeen)
        }
        Some(previous) if previous == cnt => Ok(IngestOutcome::Unchanged),
        Some(previous) => {
            conn.execute(
                r#"
                UPDATE tag_states
                SET last_cnt = ?1, last_timestamp = ?2, total_updates = total_updates + 1
                WHERE tag_id = ?3
                "#,
                [cnt_text.as_str(), timestamp, tag_id],
            )
            .await?;
            Ok(IngestOutcome::Changed { previous })
        }
    }
}

async fn last_cnt(conn: &Connection, tag_id: &str) -> Result<Option<u64>> {
    let mut rows = conn
        .query("SELECT last_cnt FROM tag_states WHERE tag_id = ?1", [tag_id])
        .await?;

    match rows.next().await? {
        Some(row) => {
            let value = db::text(&row, 0)?;
            Ok(Some(db::parse_cnt("last_cnt", &value)?))
        }
        None => Ok(None),
    }
}
