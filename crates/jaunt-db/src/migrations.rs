use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id             TEXT PRIMARY KEY,
                email          TEXT NOT NULL UNIQUE,
                display_name   TEXT,
                last_login_at  TEXT NOT NULL DEFAULT (datetime('now')),
                created_at     TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS subscriptions (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id),
                provider    TEXT NOT NULL,
                plan        TEXT NOT NULL,
                status      TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, provider)
            );

            CREATE TABLE IF NOT EXISTS trips (
                id              TEXT PRIMARY KEY,
                owner_id        TEXT NOT NULL REFERENCES users(id),
                title           TEXT NOT NULL,
                start_date      TEXT,
                end_date        TEXT,
                timezone        TEXT NOT NULL,
                cover_media_id  TEXT,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS trip_members (
                trip_id     TEXT NOT NULL REFERENCES trips(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                role        TEXT NOT NULL,
                status      TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (trip_id, user_id)
            );

            CREATE INDEX IF NOT EXISTS idx_trip_members_user
                ON trip_members(user_id, status);

            CREATE TABLE IF NOT EXISTS moments (
                id             TEXT PRIMARY KEY,
                trip_id        TEXT NOT NULL REFERENCES trips(id),
                creator_id     TEXT NOT NULL REFERENCES users(id),
                story          TEXT,
                location_name  TEXT,
                moment_time    TEXT,
                created_at     TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_moments_trip
                ON moments(trip_id, created_at);

            CREATE TABLE IF NOT EXISTS media (
                id             TEXT PRIMARY KEY,
                trip_id        TEXT NOT NULL REFERENCES trips(id),
                moment_id      TEXT NOT NULL REFERENCES moments(id),
                media_type     TEXT NOT NULL,
                storage_key    TEXT NOT NULL,
                cdn_url        TEXT,
                thumbnail_url  TEXT,
                size_bytes     INTEGER,
                sort_order     INTEGER NOT NULL DEFAULT 0,
                created_at     TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_media_moment
                ON media(moment_id);

            CREATE TABLE IF NOT EXISTS attachments (
                id               TEXT PRIMARY KEY,
                trip_id          TEXT NOT NULL REFERENCES trips(id),
                moment_id        TEXT REFERENCES moments(id),
                uploader_id      TEXT NOT NULL REFERENCES users(id),
                attachment_type  TEXT NOT NULL,
                title            TEXT,
                storage_key      TEXT,
                cdn_url          TEXT,
                url              TEXT,
                size_bytes       INTEGER,
                created_at       TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_attachments_moment
                ON attachments(moment_id);
            CREATE INDEX IF NOT EXISTS idx_attachments_trip
                ON attachments(trip_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
