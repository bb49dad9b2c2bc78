/// Database row types — these map directly to SQLite rows.
/// Distinct from the jaunt-types wire models to keep the DB layer
/// independent of the HTTP surface.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
    pub last_login_at: String,
    pub created_at: String,
}

pub struct MemberRow {
    pub trip_id: String,
    pub user_id: String,
    pub role: String,
    pub status: String,
}

/// Trip joined with its cover media row; `cover_url` is NULL when the trip
/// has no cover.
pub struct TripRow {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub timezone: String,
    pub cover_url: Option<String>,
    pub created_at: String,
}

pub struct MomentRow {
    pub id: String,
    pub trip_id: String,
    pub creator_id: String,
    pub story: Option<String>,
    pub location_name: Option<String>,
    pub moment_time: Option<String>,
    pub created_at: String,
}

pub struct MediaRow {
    pub id: String,
    pub moment_id: String,
    pub media_type: String,
    pub storage_key: String,
    pub cdn_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub size_bytes: Option<i64>,
    pub sort_order: i64,
    pub created_at: String,
}

pub struct AttachmentRow {
    pub id: String,
    pub moment_id: Option<String>,
    pub uploader_id: String,
    pub attachment_type: String,
    pub title: Option<String>,
    pub storage_key: Option<String>,
    pub cdn_url: Option<String>,
    pub url: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: String,
}
