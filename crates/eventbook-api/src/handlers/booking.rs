//! Booking handlers: book, confirm, cancel, look up.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;

use eventbook_core::types::{BookingId, EventId};

use crate::dto::request::{BookRequest, ConfirmRequest};
use crate::dto::response::{ApiResponse, BookingResponse};
use crate::error::ApiResult;
use crate::extractors::path::parse_id;
use crate::extractors::{AuthUser, ValidatedJson};
use crate::state::AppState;

/// POST /api/events/{id}/book
pub async fn book(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<BookRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BookingResponse>>)> {
    let event_id: EventId = parse_id(&id)?;
    let booking = state
        .booking_service
        .book(&auth, event_id, req.seat_count)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(booking.into()))))
}

/// POST /api/events/confirm
pub async fn confirm(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<ConfirmRequest>,
) -> ApiResult<Json<ApiResponse<BookingResponse>>> {
    let booking = state
        .booking_service
        .confirm(&auth, &req.booking_code)
        .await?;
    Ok(Json(ApiResponse::ok(booking.into())))
}

/// POST /api/bookings/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<BookingResponse>>> {
    let booking_id: BookingId = parse_id(&id)?;
    let booking = state.booking_service.cancel(&auth, booking_id).await?;
    Ok(Json(ApiResponse::ok(booking.into())))
}

/// GET /api/bookings/by-code/{code}
pub async fn get_by_code(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(code): Path<String>,
) -> ApiResult<Json<ApiResponse<BookingResponse>>> {
    let booking = state.booking_service.get_by_code(&auth, &code).await?;
    Ok(Json(ApiResponse::ok(booking.into())))
}
