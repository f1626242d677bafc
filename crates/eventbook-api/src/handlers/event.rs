//! Event handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use eventbook_core::types::EventId;

use crate::dto::request::CreateEventRequest;
use crate::dto::response::{ApiResponse, EventResponse};
use crate::error::ApiResult;
use crate::extractors::path::parse_id;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// POST /api/events
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<EventResponse>>)> {
    let event = state.event_service.create_event(&auth, req.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(event.into()))))
}

/// GET /api/events
pub async fn list_events(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<EventResponse>>>> {
    let events = state.event_service.list_events().await?;
    Ok(Json(ApiResponse::ok(
        events.into_iter().map(EventResponse::from).collect(),
    )))
}

/// GET /api/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<EventResponse>>> {
    let event_id: EventId = parse_id(&id)?;
    let event = state.event_service.get_event(event_id).await?;
    Ok(Json(ApiResponse::ok(event.into())))
}
