use anyhow::anyhow;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use uuid::Uuid;

use jaunt_types::api::MeResponse;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

/// Per-request authentication context, resolved once by the middleware and
/// passed to handlers as an extension — never ambient state.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

/// Resolve the trusted identity headers into a durable user row, creating
/// it (with its default subscription) on first sight. `X-User-Email` is
/// required; `X-User-Name` only refreshes the display name.
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let email = header_value(req.headers(), "x-user-email")
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let name = header_value(req.headers(), "x-user-name")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let new_user_id = Uuid::new_v4().to_string();
    let new_subscription_id = Uuid::new_v4().to_string();
    let db = state.clone();
    let lookup = email.clone();
    let user = run_blocking(move || {
        db.db
            .resolve_user(&lookup, name.as_deref(), &new_user_id, &new_subscription_id)
    })
    .await?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow!("Corrupt user id '{}': {}", user.id, e)))?;

    req.extensions_mut().insert(Identity {
        user_id,
        email: user.email,
    });
    Ok(next.run(req).await)
}

pub async fn me(Extension(identity): Extension<Identity>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: identity.user_id,
        email: identity.email,
    })
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
