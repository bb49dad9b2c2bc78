use anyhow::Result;
use rusqlite::params;

use crate::Database;
use crate::models::{AttachmentRow, MediaRow, MomentRow};

impl Database {
    /// Single insert; absent optional fields land as NULL. Empty strings are
    /// stored verbatim — only true absence becomes NULL.
    pub fn insert_moment(
        &self,
        id: &str,
        trip_id: &str,
        creator_id: &str,
        story: Option<&str>,
        location_name: Option<&str>,
        moment_time: Option<&str>,
    ) -> Result<()> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO moments (id, trip_id, creator_id, story, location_name, moment_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, trip_id, creator_id, story, location_name, moment_time],
            )?;
            Ok(())
        })
    }

    /// Moments of a trip ordered by effective time ascending: the supplied
    /// moment time when present, the creation time otherwise. Both columns
    /// hold UTC `%Y-%m-%d %H:%M:%S` text, so lexical order is chronological.
    pub fn list_moments(&self, trip_id: &str) -> Result<Vec<MomentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, trip_id, creator_id, story, location_name, moment_time, created_at
                 FROM moments
                 WHERE trip_id = ?1
                 ORDER BY COALESCE(moment_time, created_at) ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([trip_id], |row| {
                    Ok(MomentRow {
                        id: row.get(0)?,
                        trip_id: row.get(1)?,
                        creator_id: row.get(2)?,
                        story: row.get(3)?,
                        location_name: row.get(4)?,
                        moment_time: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Batch-fetch media for a set of moment ids in one query, ordered for
    /// display within each moment.
    pub fn media_for_moments(&self, moment_ids: &[String]) -> Result<Vec<MediaRow>> {
        if moment_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=moment_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, moment_id, media_type, storage_key, cdn_url, thumbnail_url,
                        size_bytes, sort_order, created_at
                 FROM media
                 WHERE moment_id IN ({})
                 ORDER BY moment_id ASC, sort_order ASC, created_at ASC, rowid ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let bind: Vec<&dyn rusqlite::types::ToSql> = moment_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(bind.as_slice(), |row| {
                    Ok(MediaRow {
                        id: row.get(0)?,
                        moment_id: row.get(1)?,
                        media_type: row.get(2)?,
                        storage_key: row.get(3)?,
                        cdn_url: row.get(4)?,
                        thumbnail_url: row.get(5)?,
                        size_bytes: row.get(6)?,
                        sort_order: row.get(7)?,
                        created_at: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Batch-fetch attachments for a set of moment ids in one query.
    pub fn attachments_for_moments(&self, moment_ids: &[String]) -> Result<Vec<AttachmentRow>> {
        if moment_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=moment_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, moment_id, uploader_id, attachment_type, title, storage_key,
                        cdn_url, url, size_bytes, created_at
                 FROM attachments
                 WHERE moment_id IN ({})
                 ORDER BY moment_id ASC, created_at ASC, rowid ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let bind: Vec<&dyn rusqlite::types::ToSql> = moment_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(bind.as_slice(), |row| {
                    Ok(AttachmentRow {
                        id: row.get(0)?,
                        moment_id: row.get(1)?,
                        uploader_id: row.get(2)?,
                        attachment_type: row.get(3)?,
                        title: row.get(4)?,
                        storage_key: row.get(5)?,
                        cdn_url: row.get(6)?,
                        url: row.get(7)?,
                        size_bytes: row.get(8)?,
                        created_at: row.get(9)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}
