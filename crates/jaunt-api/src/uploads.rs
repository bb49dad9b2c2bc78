use axum::extract::{Multipart, State};
use axum::{Extension, Json};
use uuid::Uuid;

use jaunt_store::key::storage_key;
use jaunt_store::{ObjectStore, UPLOAD_URL_TTL};
use jaunt_types::api::{ProxyUploadResponse, SignUploadRequest, SignUploadResponse};

use crate::error::ApiError;
use crate::identity::Identity;
use crate::{AppState, run_blocking};

/// Upper bound for relayed uploads; enforced before the store is touched.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Hand out a time-limited upload URL for a freshly derived storage key.
/// Nothing checks that the key ever gets uploaded; the orphan sweep picks
/// up abandoned signs later.
pub async fn sign_upload(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<SignUploadRequest>,
) -> Result<Json<SignUploadResponse>, ApiError> {
    let trip_id = req
        .trip_id
        .ok_or_else(|| ApiError::BadRequest("tripId is required".into()))?;
    let kind = req
        .kind
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::BadRequest("kind is required".into()))?;
    let filename = req
        .filename
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::BadRequest("filename is required".into()))?;

    check_membership(&state, trip_id, identity.user_id).await?;

    let key = storage_key(&trip_id.to_string(), &kind, &filename);
    let signed_url = state
        .store
        .presign_upload(&key, UPLOAD_URL_TTL)
        .await
        .map_err(ApiError::Internal)?;
    let cdn_url = state.store.public_url(&key);

    Ok(Json(SignUploadResponse {
        signed_url,
        storage_key: key,
        cdn_url,
    }))
}

/// Relay path: the client sends the bytes to us and we write them to the
/// store, holding the request for the duration of the upload.
pub async fn proxy_upload(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    mut multipart: Multipart,
) -> Result<Json<ProxyUploadResponse>, ApiError> {
    let mut trip_id: Option<Uuid> = None;
    let mut kind: Option<String> = None;
    let mut file: Option<(String, String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("tripId") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable tripId: {}", e)))?;
                trip_id = Some(
                    raw.parse()
                        .map_err(|_| ApiError::BadRequest("tripId must be a UUID".into()))?,
                );
            }
            Some("kind") => {
                kind = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("unreadable kind: {}", e)))?,
                );
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("unreadable file: {}", e)))?;
                file = Some((filename, content_type, data));
            }
            _ => {}
        }
    }

    let trip_id = trip_id.ok_or_else(|| ApiError::BadRequest("tripId is required".into()))?;
    let kind = kind
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::BadRequest("kind is required".into()))?;
    let (filename, content_type, data) =
        file.ok_or_else(|| ApiError::BadRequest("file is required".into()))?;

    if data.is_empty() {
        return Err(ApiError::BadRequest("file is empty".into()));
    }
    if data.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::BadRequest(
            "file exceeds the 50 MB upload limit".into(),
        ));
    }

    check_membership(&state, trip_id, identity.user_id).await?;

    let key = storage_key(&trip_id.to_string(), &kind, &filename);
    let size_bytes = data.len() as i64;
    state
        .store
        .put(&key, data)
        .await
        .map_err(ApiError::Internal)?;
    let cdn_url = state.store.public_url(&key);

    Ok(Json(ProxyUploadResponse {
        storage_key: key,
        cdn_url,
        size_bytes,
        content_type,
    }))
}

/// Shared fresh membership check for the trip-scoped upload routes.
pub(crate) async fn check_membership(
    state: &AppState,
    trip_id: Uuid,
    user_id: Uuid,
) -> Result<(), ApiError> {
    let db = state.clone();
    let tid = trip_id.to_string();
    let uid = user_id.to_string();
    let member = run_blocking(move || db.db.membership(&tid, &uid)).await?;
    if member.is_none() {
        return Err(ApiError::Forbidden("no access to this trip"));
    }
    Ok(())
}
