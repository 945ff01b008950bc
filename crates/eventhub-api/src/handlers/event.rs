//! Event catalogue handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;

use eventhub_core::types::PageResponse;

use crate::dto::request::{CreateEventRequest, UpdateEventRequest, validate_body};
use crate::dto::response::{ApiResponse, EventResponse, MessageResponse};
use crate::error::ApiError;
use crate::extractors::{AuthUser, EventListParams};
use crate::state::AppState;

/// GET /api/events
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventListParams>,
) -> Result<Json<ApiResponse<PageResponse<EventResponse>>>, ApiError> {
    let (query, page) = params.into_parts()?;
    let events = state.event_service.list_events(query, page).await?;
    Ok(Json(ApiResponse::ok(events.map(EventResponse::from))))
}

/// GET /api/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EventResponse>>, ApiError> {
    let event = state.event_service.get_event(id).await?;
    Ok(Json(ApiResponse::ok(event.into())))
}

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EventResponse>>), ApiError> {
    validate_body(&req)?;

    let event = state
        .event_service
        .create_event(auth.context(), req.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(event.into()))))
}

/// PATCH /api/events/{id}
pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateEventRequest>,
) -> Result<Json<ApiResponse<EventResponse>>, ApiError> {
    validate_body(&req)?;

    let event = state
        .event_service
        .update_event(auth.context(), id, req.into())
        .await?;
    Ok(Json(ApiResponse::ok(event.into())))
}

/// DELETE /api/events/{id}
pub async fn delete_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.event_service.delete_event(auth.context(), id).await?;
    Ok(Json(ApiResponse::ok(MessageResponse {
        message: "Event deleted".to_string(),
    })))
}
