//! Seat registration handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;

use eventhub_entity::registration::Registration;

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/events/{id}/register
pub async fn register(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ApiResponse<Registration>>), ApiError> {
    let registration = state
        .registration_service
        .register(auth.context(), event_id)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(registration))))
}

/// DELETE /api/registrations/{id}
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Registration>>, ApiError> {
    let registration = state
        .registration_service
        .cancel(auth.context(), id)
        .await?;
    Ok(Json(ApiResponse::ok(registration)))
}

/// GET /api/registrations/me
pub async fn list_mine(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<Vec<Registration>>>, ApiError> {
    let registrations = state
        .registration_service
        .list_my_registrations(auth.context())
        .await?;
    Ok(Json(ApiResponse::ok(registrations)))
}

/// GET /api/events/{id}/registrations
pub async fn list_for_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Registration>>>, ApiError> {
    let registrations = state
        .registration_service
        .list_event_registrations(auth.context(), event_id)
        .await?;
    Ok(Json(ApiResponse::ok(registrations)))
}
