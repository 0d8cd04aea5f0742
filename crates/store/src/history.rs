//! History, raw state access and store statistics

use crate::TagStore;
use crate::db;
use crate::error::Result;
use crate::models::{HistoryRecord, StoreStats, TagState};

const SELECT_STATE: &str = r#"
SELECT tag_id, last_cnt, last_timestamp, first_seen, total_updates, created_at
FROM tag_states
"#;

impl TagStore {
    /// Most recent history of a tag, newest first
    ///
    /// Rows with the same `received_at` come back in reverse insertion order.
    pub async fn get_history(&self, tag_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let _guard = self.read_lock().await;
        let conn = self.connect()?;
        let sql = format!(
            "SELECT tag_id, cnt, timestamp, received_at FROM tag_history \
             WHERE tag_id = ?1 ORDER BY received_at DESC, id DESC LIMIT {limit}"
        );
        let mut rows = conn.query(&sql, [tag_id]).await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let cnt = db::text(&row, 1)?;
            let received_at = db::text(&row, 3)?;
            records.push(HistoryRecord {
                tag_id: db::text(&row, 0)?,
                cnt: db::parse_cnt("cnt", &cnt)?,
                timestamp: db::text(&row, 2)?,
                received_at: db::parse_instant("received_at", &received_at)?,
            });
        }

        Ok(records)
    }

    /// Last-known state of an observed tag
    pub async fn get_tag_state(&self, tag_id: &str) -> Result<Option<TagState>> {
        let _guard = self.read_lock().await;
        let conn = self.connect()?;

        let sql = format!("{SELECT_STATE} WHERE tag_id = ?1");
        let mut rows = conn.query(&sql, [tag_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_state(&row)?)),
            None => Ok(None),
        }
    }

    /// All tag states, most recently created first
    pub async fn list_tag_states(&self) -> Result<Vec<TagState>> {
        let _guard = self.read_lock().await;
        let conn = self.connect()?;

        let sql = format!("{SELECT_STATE} ORDER BY created_at DESC, tag_id ASC");
        let mut rows = conn.query(&sql, ()).await?;

        let mut states = Vec::new();
        while let Some(row) = rows.next().await? {
            states.push(row_to_state(&row)?);
        }

        Ok(states)
    }

    /// Row counts of the three tables
    pub async fn statistics(&self) -> Result<StoreStats> {
        let _guard = self.read_lock().await;
        let conn = self.connect()?;

        let mut stats = StoreStats::default();
        for (table, slot) in [
            ("registered_tags", &mut stats.registered_tags),
            ("tag_states", &mut stats.active_tags),
            ("tag_history", &mut stats.history_records),
        ] {
            let mut rows = conn
                .query(&format!("SELECT COUNT(*) FROM {table}"), ())
                .await?;
            if let Some(row) = rows.next().await? {
                *slot = db::count(&row, 0)?;
            }
        }

        Ok(stats)
    }
}

fn row_to_state(row: &turso::Row) -> Result<TagState> {
    let last_cnt = db::text(row, 1)?;
    let created_at = db::text(row, 5)?;

    Ok(TagState {
        tag_id: db::text(row, 0)?,
        last_cnt: db::parse_cnt("last_cnt", &last_cnt)?,
        last_timestamp: db::text(row, 2)?,
        first_seen: db::text(row, 3)?,
        total_updates: db::count(row, 4)?,
        created_at: db::parse_instant("created_at", &created_at)?,
    })
}
