pub mod commits;
pub mod error;
pub mod identity;
pub mod moments;
pub mod objects;
mod time;
pub mod trips;
pub mod uploads;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router, extract::State, middleware};
use uuid::Uuid;

use jaunt_db::Database;
use jaunt_store::DiskStore;
use jaunt_types::api::HealthResponse;

use crate::error::ApiError;

pub struct AppStateInner {
    pub db: Database,
    pub store: Arc<DiskStore>,
}

pub type AppState = Arc<AppStateInner>;

/// Assemble the full route tree. The caller layers CORS, tracing and body
/// limits on top.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/me", get(identity::me))
        .route("/api/trips", get(trips::list_trips).post(trips::create_trip))
        .route("/api/trips/{trip_id}", get(trips::get_trip))
        .route(
            "/api/trips/{trip_id}/moments",
            get(moments::list_moments).post(moments::create_moment),
        )
        .route("/api/uploads/sign", post(uploads::sign_upload))
        .route("/api/uploads/proxy", post(uploads::proxy_upload))
        .route("/api/media/commit", post(commits::commit_media))
        .route("/api/attachments/commit", post(commits::commit_attachment))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identity::require_identity,
        ));

    Router::new()
        .route("/health", get(health))
        .route(
            "/storage/{*key}",
            put(objects::put_object).get(objects::get_object),
        )
        .merge(api)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db = state.clone();
    match run_blocking(move || db.db.ping()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                ok: true,
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse {
                ok: false,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Run rusqlite work off the async runtime. A panicked or cancelled worker
/// surfaces as an internal error rather than poisoning the request task.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(ApiError::Internal)
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Corrupt id '{}': {}", raw, e)))
}
