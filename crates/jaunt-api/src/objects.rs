use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use serde::Deserialize;

use jaunt_store::ObjectStore;

use crate::error::ApiError;
use crate::uploads::MAX_UPLOAD_BYTES;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub expires: u64,
    pub sig: String,
}

/// PUT /storage/{key} — the target of presigned upload URLs. Only requests
/// carrying a fresh, genuine signature for exactly this key may write.
pub async fn put_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    if !state.store.verify_upload(&key, query.expires, &query.sig) {
        return Err(ApiError::Forbidden("invalid or expired upload signature"));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty body".into()));
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::BadRequest(
            "object exceeds the 50 MB upload limit".into(),
        ));
    }

    state
        .store
        .put(&key, body)
        .await
        .map_err(ApiError::Internal)?;
    Ok(StatusCode::OK)
}

/// GET /storage/{key} — public object read; the configured CDN base points
/// here when no real CDN fronts the server.
pub async fn get_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // Malformed keys can't name a stored object, so they read as absent.
    if !jaunt_store::key::validate_key(&key) {
        return Err(ApiError::NotFound("object"));
    }

    match state.store.get(&key).await.map_err(ApiError::Internal)? {
        Some(data) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            data,
        )),
        None => Err(ApiError::NotFound("object")),
    }
}
