//! Tag registration and the joined read views

use tracing::{debug, info};
use turso::Connection;

use crate::TagStore;
use crate::db::{self, begin, commit, rollback};
use crate::error::{Result, StoreError};
use crate::models::{RegisteredTag, TagStatus, TagView};

/// Registration left-joined with state; column order read by `row_to_view`
const SELECT_VIEW: &str = r#"
SELECT r.id, r.description, r.registered_at, s.last_cnt, s.last_timestamp, s.total_updates
FROM registered_tags r
LEFT JOIN tag_states s ON s.tag_id = r.id
"#;

impl TagStore {
    /// Register a tag
    ///
    /// Returns `false` and changes nothing when the id is already registered.
    pub async fn register(&self, tag_id: &str, description: &str) -> Result<bool> {
        if tag_id.trim().is_empty() {
            return Err(StoreError::invalid("tag_id", "must not be empty"));
        }

        let _guard = self.write_lock().await;
        let conn = self.connect()?;
        begin(&conn).await?;

        match Self::insert_registration(&conn, tag_id, description).await {
            Ok(true) => {
                commit(&conn).await?;
                info!(tag_id, "tag registered");
                Ok(true)
            }
            Ok(false) => {
                rollback(&conn).await;
                debug!(tag_id, "tag already registered");
                Ok(false)
            }
            Err(e) => {
                rollback(&conn).await;
                Err(e)
            }
        }
    }

    async fn insert_registration(
        conn: &Connection,
        tag_id: &str,
        description: &str,
    ) -> Result<bool> {
        if registration_exists(conn, tag_id).await? {
            return Ok(false);
        }

        let registered_at = db::now_string();
        conn.execute(
            "INSERT INTO registered_tags (id, description, registered_at) VALUES (?1, ?2, ?3)",
            [tag_id, description, registered_at.as_str()],
        )
        .await?;

        Ok(true)
    }

    /// Whether a registration exists for the id
    pub async fn is_registered(&self, tag_id: &str) -> Result<bool> {
        let _guard = self.read_lock().await;
        let conn = self.connect()?;
        registration_exists(&conn, tag_id).await
    }

    /// Registration record without state
    pub async fn get_registration(&self, tag_id: &str) -> Result<Option<RegisteredTag>> {
        let _guard = self.read_lock().await;
        let conn = self.connect()?;

        let mut rows = conn
            .query(
                "SELECT id, description, registered_at FROM registered_tags WHERE id = ?1",
                [tag_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let registered_at = db::text(&row, 2)?;
                Ok(Some(RegisteredTag {
                    id: db::text(&row, 0)?,
                    description: db::text(&row, 1)?,
                    registered_at: db::parse_instant("registered_at", &registered_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    /// All registered tags with their state, most recently registered first
    pub async fn get_registered_tags(&self) -> Result<Vec<TagView>> {
        let _guard = self.read_lock().await;
        let conn = self.connect()?;

        let sql = format!("{SELECT_VIEW} ORDER BY r.registered_at DESC, r.id ASC");
        let mut rows = conn.query(&sql, ()).await?;

        let mut tags = Vec::new();
        while let Some(row) = rows.next().await? {
            tags.push(row_to_view(&row)?);
        }

        Ok(tags)
    }

    /// Joined view of one tag, `None` when not registered
    pub async fn get_status(&self, tag_id: &str) -> Result<Option<TagView>> {
        let _guard = self.read_lock().await;
        let conn = self.connect()?;

        let sql = format!("{SELECT_VIEW} WHERE r.id = ?1");
        let mut rows = conn.query(&sql, [tag_id]).await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_view(&row)?)),
            None => Ok(None),
        }
    }
}

pub(crate) async fn registration_exists(conn: &Connection, tag_id: &str) -> Result<bool> {
    let mut rows = conn
        .query("SELECT 1 FROM registered_tags WHERE id = ?1", [tag_id])
        .await?;
    Ok(rows.next().await?.is_some())
}

fn row_to_view(row: &turso::Row) -> Result<TagView> {
    let registered_at = db::text(row, 2)?;
    let last_cnt = db::optional_text(row, 3)?;

    let (last_cnt, status) = match last_cnt {
        Some(cnt) => (Some(db::parse_cnt("last_cnt", &cnt)?), TagStatus::Active),
        None => (None, TagStatus::Registered),
    };

    Ok(TagView {
        id: db::text(row, 0)?,
        description: db::text(row, 1)?,
        registered_at: db::parse_instant("registered_at", &registered_at)?,
        last_cnt,
        last_seen: db::optional_text(row, 4)?,
        total_updates: db::count(row, 5)?,
        status,
    })
}
