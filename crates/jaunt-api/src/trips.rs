use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use jaunt_db::models::TripRow;
use jaunt_types::api::{CreateTripRequest, TripResponse};

use crate::error::ApiError;
use crate::identity::Identity;
use crate::time::{parse_db_date, parse_db_timestamp};
use crate::{AppState, parse_uuid, run_blocking};

/// Trips created without an explicit timezone get this one.
pub(crate) const DEFAULT_TIMEZONE: &str = "America/New_York";

pub async fn list_trips(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<TripResponse>>, ApiError> {
    let db = state.clone();
    let user_id = identity.user_id.to_string();
    let rows = run_blocking(move || db.db.list_trips(&user_id)).await?;

    let trips = rows
        .into_iter()
        .map(trip_response)
        .collect::<Result<Vec<_>, ApiError>>()?;
    Ok(Json(trips))
}

pub async fn create_trip(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateTripRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = req
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("title is required".into()))?
        .to_string();
    let timezone = req
        .timezone
        .filter(|tz| !tz.is_empty())
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

    let trip_id = Uuid::new_v4().to_string();
    let owner_id = identity.user_id.to_string();
    let start_date = req.start_date.map(|d| d.to_string());
    let end_date = req.end_date.map(|d| d.to_string());

    let db = state.clone();
    let row = run_blocking(move || {
        db.db.create_trip(
            &trip_id,
            &owner_id,
            &title,
            start_date.as_deref(),
            end_date.as_deref(),
            &timezone,
        )
    })
    .await?;

    Ok((StatusCode::CREATED, Json(trip_response(row)?)))
}

/// A missing trip is 404 regardless of the access outcome; an existing trip
/// without an active membership is 403.
pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<TripResponse>, ApiError> {
    let db = state.clone();
    let tid = trip_id.to_string();
    let user_id = identity.user_id.to_string();

    let (trip, member) = run_blocking(move || {
        let trip = db.db.get_trip(&tid)?;
        let member = db.db.membership(&tid, &user_id)?;
        Ok((trip, member))
    })
    .await?;

    let Some(trip) = trip else {
        return Err(ApiError::NotFound("trip"));
    };
    if member.is_none() {
        return Err(ApiError::Forbidden("no access to this trip"));
    }

    Ok(Json(trip_response(trip)?))
}

pub(crate) fn trip_response(row: TripRow) -> Result<TripResponse, ApiError> {
    Ok(TripResponse {
        id: parse_uuid(&row.id)?,
        owner_id: parse_uuid(&row.owner_id)?,
        title: row.title,
        start_date: row
            .start_date
            .as_deref()
            .map(parse_db_date)
            .transpose()
            .map_err(ApiError::Internal)?,
        end_date: row
            .end_date
            .as_deref()
            .map(parse_db_date)
            .transpose()
            .map_err(ApiError::Internal)?,
        timezone: row.timezone,
        cover_url: row.cover_url,
        created_at: parse_db_timestamp(&row.created_at).map_err(ApiError::Internal)?,
    })
}
