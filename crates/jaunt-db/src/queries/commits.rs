use std::collections::HashSet;

use anyhow::Result;
use rusqlite::{OptionalExtension, params};

use crate::Database;

impl Database {
    /// Record uploaded media against a moment. The moment must belong to the
    /// given trip; a mismatch writes nothing and returns `false` so the
    /// caller can surface not-found. Check and insert share one transaction.
    pub fn commit_media(
        &self,
        id: &str,
        trip_id: &str,
        moment_id: &str,
        media_type: &str,
        storage_key: &str,
        cdn_url: Option<&str>,
        thumbnail_url: Option<&str>,
        size_bytes: Option<i64>,
        sort_order: i64,
    ) -> Result<bool> {
        self.with_writer(|conn| {
            let tx = conn.transaction()?;

            let belongs: Option<String> = tx
                .query_row(
                    "SELECT id FROM moments WHERE id = ?1 AND trip_id = ?2",
                    params![moment_id, trip_id],
                    |row| row.get(0),
                )
                .optional()?;
            if belongs.is_none() {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO media (id, trip_id, moment_id, media_type, storage_key,
                                    cdn_url, thumbnail_url, size_bytes, sort_order)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    id,
                    trip_id,
                    moment_id,
                    media_type,
                    storage_key,
                    cdn_url,
                    thumbnail_url,
                    size_bytes,
                    sort_order
                ],
            )?;

            tx.commit()?;
            Ok(true)
        })
    }

    /// Record an attachment, trip-level when no moment is given.
    pub fn commit_attachment(
        &self,
        id: &str,
        trip_id: &str,
        moment_id: Option<&str>,
        uploader_id: &str,
        attachment_type: &str,
        title: Option<&str>,
        storage_key: Option<&str>,
        cdn_url: Option<&str>,
        url: Option<&str>,
        size_bytes: Option<i64>,
    ) -> Result<()> {
        self.with_writer(|conn| {
            conn.execute(
                "INSERT INTO attachments (id, trip_id, moment_id, uploader_id, attachment_type,
                                          title, storage_key, cdn_url, url, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    trip_id,
                    moment_id,
                    uploader_id,
                    attachment_type,
                    title,
                    storage_key,
                    cdn_url,
                    url,
                    size_bytes
                ],
            )?;
            Ok(())
        })
    }

    /// Every storage key some media or attachment row still references.
    /// The orphan sweep deletes stored objects outside this set.
    pub fn referenced_storage_keys(&self) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT storage_key FROM media
                 UNION
                 SELECT storage_key FROM attachments WHERE storage_key IS NOT NULL",
            )?;

            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;

            Ok(keys)
        })
    }
}
