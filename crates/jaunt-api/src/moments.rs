use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use jaunt_db::models::{AttachmentRow, MediaRow, MomentRow};
use jaunt_types::api::{
    AttachmentResponse, CreateMomentRequest, CreatedResponse, MediaResponse, MomentResponse,
};

use crate::error::ApiError;
use crate::identity::Identity;
use crate::time::{parse_db_timestamp, to_db_timestamp};
use crate::{AppState, parse_uuid, run_blocking};

/// Moment aggregates for a trip: each moment carries its media and
/// attachments, fetched in one batched query apiece regardless of the
/// number of moments.
pub async fn list_moments(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<MomentResponse>>, ApiError> {
    let db = state.clone();
    let tid = trip_id.to_string();
    let user_id = identity.user_id.to_string();

    let fetched = run_blocking(move || {
        if db.db.membership(&tid, &user_id)?.is_none() {
            return Ok(None);
        }

        let moments = db.db.list_moments(&tid)?;
        let ids: Vec<String> = moments.iter().map(|m| m.id.clone()).collect();
        let media = db.db.media_for_moments(&ids)?;
        let attachments = db.db.attachments_for_moments(&ids)?;
        Ok(Some((moments, media, attachments)))
    })
    .await?;

    let Some((moments, media, attachments)) = fetched else {
        return Err(ApiError::Forbidden("no access to this trip"));
    };

    // Group child rows by moment id; encounter order is already display order.
    let mut media_map: HashMap<String, Vec<MediaResponse>> = HashMap::new();
    for row in media {
        let parent = row.moment_id.clone();
        media_map.entry(parent).or_default().push(media_response(row)?);
    }
    let mut attachment_map: HashMap<String, Vec<AttachmentResponse>> = HashMap::new();
    for row in attachments {
        let Some(parent) = row.moment_id.clone() else {
            continue;
        };
        attachment_map
            .entry(parent)
            .or_default()
            .push(attachment_response(row)?);
    }

    let aggregates = moments
        .into_iter()
        .map(|row| {
            let media = media_map.remove(&row.id).unwrap_or_default();
            let attachments = attachment_map.remove(&row.id).unwrap_or_default();
            moment_response(row, media, attachments)
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(aggregates))
}

pub async fn create_moment(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateMomentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::new_v4();
    let moment_id = id.to_string();
    let tid = trip_id.to_string();
    let user_id = identity.user_id.to_string();
    let moment_time = req.moment_time.map(to_db_timestamp);

    let db = state.clone();
    let created = run_blocking(move || {
        if db.db.membership(&tid, &user_id)?.is_none() {
            return Ok(false);
        }
        db.db.insert_moment(
            &moment_id,
            &tid,
            &user_id,
            req.story.as_deref(),
            req.location_name.as_deref(),
            moment_time.as_deref(),
        )?;
        Ok(true)
    })
    .await?;

    if !created {
        return Err(ApiError::Forbidden("no access to this trip"));
    }

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

fn moment_response(
    row: MomentRow,
    media: Vec<MediaResponse>,
    attachments: Vec<AttachmentResponse>,
) -> Result<MomentResponse, ApiError> {
    let created_at = parse_db_timestamp(&row.created_at).map_err(ApiError::Internal)?;
    let moment_time = row
        .moment_time
        .as_deref()
        .map(parse_db_timestamp)
        .transpose()
        .map_err(ApiError::Internal)?;

    // The effective time drives both ordering (in SQL) and the day bucket.
    let effective = moment_time.unwrap_or(created_at);

    Ok(MomentResponse {
        id: parse_uuid(&row.id)?,
        trip_id: parse_uuid(&row.trip_id)?,
        creator_id: parse_uuid(&row.creator_id)?,
        story: row.story,
        location_name: row.location_name,
        moment_time,
        day_key: effective.date_naive(),
        created_at,
        media,
        attachments,
    })
}

fn media_response(row: MediaRow) -> Result<MediaResponse, ApiError> {
    Ok(MediaResponse {
        id: parse_uuid(&row.id)?,
        media_type: row.media_type,
        storage_key: row.storage_key,
        cdn_url: row.cdn_url,
        thumbnail_url: row.thumbnail_url,
        size_bytes: row.size_bytes,
        sort_order: row.sort_order,
        created_at: parse_db_timestamp(&row.created_at).map_err(ApiError::Internal)?,
    })
}

fn attachment_response(row: AttachmentRow) -> Result<AttachmentResponse, ApiError> {
    Ok(AttachmentResponse {
        id: parse_uuid(&row.id)?,
        moment_id: row
            .moment_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?,
        uploader_id: parse_uuid(&row.uploader_id)?,
        attachment_type: row.attachment_type,
        title: row.title,
        storage_key: row.storage_key,
        cdn_url: row.cdn_url,
        url: row.url,
        size_bytes: row.size_bytes,
        created_at: parse_db_timestamp(&row.created_at).map_err(ApiError::Internal)?,
    })
}
