use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::{MemberRow, TripRow};

impl Database {
    // -- Membership --

    /// Fresh read of the caller's active membership on a trip. `None` means
    /// no access; trip-scoped handlers map it to an authorization failure.
    pub fn membership(&self, trip_id: &str, user_id: &str) -> Result<Option<MemberRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT trip_id, user_id, role, status FROM trip_members
                     WHERE trip_id = ?1 AND user_id = ?2 AND status = 'active'",
                    params![trip_id, user_id],
                    |row| {
                        Ok(MemberRow {
                            trip_id: row.get(0)?,
                            user_id: row.get(1)?,
                            role: row.get(2)?,
                            status: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
    }

    // -- Trips --

    /// Insert a trip and enroll its owner in one transaction; the trip is
    /// never visible without the owner membership.
    pub fn create_trip(
        &self,
        id: &str,
        owner_id: &str,
        title: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
        timezone: &str,
    ) -> Result<TripRow> {
        self.with_writer(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO trips (id, owner_id, title, start_date, end_date, timezone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, owner_id, title, start_date, end_date, timezone],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO trip_members (trip_id, user_id, role, status)
                 VALUES (?1, ?2, 'owner', 'active')",
                params![id, owner_id],
            )?;

            let row = query_trip(&tx, id)?
                .ok_or_else(|| anyhow!("Trip {} missing inside its own transaction", id))?;

            tx.commit()?;
            Ok(row)
        })
    }

    /// Trips the user holds an active membership on, newest first.
    pub fn list_trips(&self, user_id: &str) -> Result<Vec<TripRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.owner_id, t.title, t.start_date, t.end_date, t.timezone,
                        m.cdn_url, t.created_at
                 FROM trips t
                 JOIN trip_members tm ON tm.trip_id = t.id
                 LEFT JOIN media m ON m.id = t.cover_media_id
                 WHERE tm.user_id = ?1 AND tm.status = 'active'
                 ORDER BY t.created_at DESC, t.rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id], map_trip_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_trip(&self, trip_id: &str) -> Result<Option<TripRow>> {
        self.with_conn(|conn| query_trip(conn, trip_id))
    }
}

fn query_trip(conn: &Connection, id: &str) -> Result<Option<TripRow>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.owner_id, t.title, t.start_date, t.end_date, t.timezone,
                m.cdn_url, t.created_at
         FROM trips t
         LEFT JOIN media m ON m.id = t.cover_media_id
         WHERE t.id = ?1",
    )?;

    let row = stmt.query_row([id], map_trip_row).optional()?;
    Ok(row)
}

fn map_trip_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TripRow> {
    Ok(TripRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        timezone: row.get(5)?,
        cover_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}
