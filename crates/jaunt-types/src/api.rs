use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Identity --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: Uuid,
    pub email: String,
}

// -- Trips --

/// Required fields are modelled as `Option` so the handler can reject a
/// missing value with a 400 instead of a deserialization rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTripRequest {
    pub title: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub timezone: String,
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Moments --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMomentRequest {
    pub story: Option<String>,
    pub location_name: Option<String>,
    pub moment_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentResponse {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub creator_id: Uuid,
    pub story: Option<String>,
    pub location_name: Option<String>,
    pub moment_time: Option<DateTime<Utc>>,
    /// UTC calendar date of `moment_time`, falling back to `created_at`.
    pub day_key: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub media: Vec<MediaResponse>,
    pub attachments: Vec<AttachmentResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub media_type: String,
    pub storage_key: String,
    pub cdn_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub size_bytes: Option<i64>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub moment_id: Option<Uuid>,
    pub uploader_id: Uuid,
    #[serde(rename = "type")]
    pub attachment_type: String,
    pub title: Option<String>,
    pub storage_key: Option<String>,
    pub cdn_url: Option<String>,
    pub url: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Returned by every creating endpoint that only hands back the new id.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

// -- Uploads --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignUploadRequest {
    pub trip_id: Option<Uuid>,
    pub kind: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUploadResponse {
    pub signed_url: String,
    pub storage_key: String,
    pub cdn_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyUploadResponse {
    pub storage_key: String,
    pub cdn_url: String,
    pub size_bytes: i64,
    pub content_type: String,
}

// -- Commits --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommitMediaRequest {
    pub trip_id: Option<Uuid>,
    pub moment_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub storage_key: Option<String>,
    pub cdn_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub size_bytes: Option<i64>,
    pub sort_order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CommitAttachmentRequest {
    pub trip_id: Option<Uuid>,
    pub moment_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub attachment_type: Option<String>,
    pub title: Option<String>,
    pub storage_key: Option<String>,
    pub cdn_url: Option<String>,
    pub size_bytes: Option<i64>,
    pub url: Option<String>,
}

// -- Health --

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
