use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use jaunt_types::api::{CommitAttachmentRequest, CommitMediaRequest, CreatedResponse};

use crate::error::ApiError;
use crate::identity::Identity;
use crate::{AppState, run_blocking};

enum MediaCommit {
    Created,
    Forbidden,
    MomentMissing,
}

/// Record an uploaded object as media on a moment. The moment must belong
/// to the given trip — an id from another trip is not-found even for a
/// caller with access to that other trip.
pub async fn commit_media(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CommitMediaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trip_id = req
        .trip_id
        .ok_or_else(|| ApiError::BadRequest("tripId is required".into()))?;
    let moment_id = req
        .moment_id
        .ok_or_else(|| ApiError::BadRequest("momentId is required".into()))?;
    let media_type = req
        .media_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("type is required".into()))?;
    let storage_key = req
        .storage_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::BadRequest("storageKey is required".into()))?;

    let id = Uuid::new_v4();
    let media_id = id.to_string();
    let tid = trip_id.to_string();
    let mid = moment_id.to_string();
    let user_id = identity.user_id.to_string();
    let sort_order = req.sort_order.unwrap_or(0);

    let db = state.clone();
    let outcome = run_blocking(move || {
        if db.db.membership(&tid, &user_id)?.is_none() {
            return Ok(MediaCommit::Forbidden);
        }
        let inserted = db.db.commit_media(
            &media_id,
            &tid,
            &mid,
            &media_type,
            &storage_key,
            req.cdn_url.as_deref(),
            req.thumbnail_url.as_deref(),
            req.size_bytes,
            sort_order,
        )?;
        Ok(if inserted {
            MediaCommit::Created
        } else {
            MediaCommit::MomentMissing
        })
    })
    .await?;

    match outcome {
        MediaCommit::Created => Ok((StatusCode::CREATED, Json(CreatedResponse { id }))),
        MediaCommit::Forbidden => Err(ApiError::Forbidden("no access to this trip")),
        MediaCommit::MomentMissing => Err(ApiError::NotFound("moment")),
    }
}

/// Record an attachment, trip-level when no moment id is given.
pub async fn commit_attachment(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CommitAttachmentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let trip_id = req
        .trip_id
        .ok_or_else(|| ApiError::BadRequest("tripId is required".into()))?;
    let attachment_type = req
        .attachment_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("type is required".into()))?;

    let id = Uuid::new_v4();
    let attachment_id = id.to_string();
    let tid = trip_id.to_string();
    let moment_id = req.moment_id.map(|m| m.to_string());
    let uploader_id = identity.user_id.to_string();

    let db = state.clone();
    let created = run_blocking(move || {
        if db.db.membership(&tid, &uploader_id)?.is_none() {
            return Ok(false);
        }
        db.db.commit_attachment(
            &attachment_id,
            &tid,
            moment_id.as_deref(),
            &uploader_id,
            &attachment_type,
            req.title.as_deref(),
            req.storage_key.as_deref(),
            req.cdn_url.as_deref(),
            req.url.as_deref(),
            req.size_bytes,
        )?;
        Ok(true)
    })
    .await?;

    if !created {
        return Err(ApiError::Forbidden("no access to this trip"));
    }

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
