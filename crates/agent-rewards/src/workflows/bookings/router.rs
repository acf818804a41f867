use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{BookingRequest, BookingStatus, VerificationStatus};
use super::repository::BookingRepository;
use super::service::{BookingError, BookingService};
use crate::auth::AuthContext;
use crate::ids::{AgentId, BookingId};
use crate::workflows::catalog::CatalogRepository;
use crate::workflows::onboarding::AgentRepository;
use crate::workflows::{error_response, repository_error_response};

pub fn booking_router<S>(service: Arc<BookingService<S>>) -> Router
where
    S: BookingRepository + CatalogRepository + AgentRepository + 'static,
{
    Router::new()
        .route("/api/v1/bookings", post(create_booking_handler::<S>))
        .route(
            "/api/v1/agents/:agent_id/bookings",
            get(list_bookings_handler::<S>),
        )
        .route(
            "/api/v1/bookings/:booking_id/verification",
            put(verify_booking_handler::<S>),
        )
        .route(
            "/api/v1/bookings/:booking_id/status",
            put(update_status_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerificationRequest {
    pub(crate) status: VerificationStatus,
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    pub(crate) status: BookingStatus,
}

pub(crate) async fn create_booking_handler<S>(
    State(service): State<Arc<BookingService<S>>>,
    ctx: AuthContext,
    axum::Json(request): axum::Json<BookingRequest>,
) -> Response
where
    S: BookingRepository + CatalogRepository + AgentRepository + 'static,
{
    match service.create_booking(&ctx, request).await {
        Ok(booking) => (StatusCode::CREATED, axum::Json(booking)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) async fn list_bookings_handler<S>(
    State(service): State<Arc<BookingService<S>>>,
    ctx: AuthContext,
    Path(agent_id): Path<AgentId>,
) -> Response
where
    S: BookingRepository + CatalogRepository + AgentRepository + 'static,
{
    match service.list_agent_bookings(&ctx, agent_id).await {
        Ok(bookings) => (StatusCode::OK, axum::Json(json!({ "bookings": bookings }))).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) async fn verify_booking_handler<S>(
    State(service): State<Arc<BookingService<S>>>,
    ctx: AuthContext,
    Path(booking_id): Path<BookingId>,
    axum::Json(request): axum::Json<VerificationRequest>,
) -> Response
where
    S: BookingRepository + CatalogRepository + AgentRepository + 'static,
{
    match service
        .verify_booking(&ctx, booking_id, request.status, request.notes)
        .await
    {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) async fn update_status_handler<S>(
    State(service): State<Arc<BookingService<S>>>,
    ctx: AuthContext,
    Path(booking_id): Path<BookingId>,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Response
where
    S: BookingRepository + CatalogRepository + AgentRepository + 'static,
{
    match service
        .update_booking_status(&ctx, booking_id, request.status)
        .await
    {
        Ok(booking) => (StatusCode::OK, axum::Json(booking)).into_response(),
        Err(error) => booking_error_response(&error),
    }
}

pub(crate) fn booking_error_response(error: &BookingError) -> Response {
    match error {
        BookingError::Forbidden(_) => error_response(
            StatusCode::FORBIDDEN,
            "forbidden",
            error.to_string(),
            Value::Null,
        ),
        BookingError::MissingFields(fields) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "missing_fields",
            error.to_string(),
            json!({ "fields": fields }),
        ),
        BookingError::InvalidDateRange { .. } => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_date_range",
            error.to_string(),
            Value::Null,
        ),
        BookingError::InvalidRoomTypeForHotel { .. } => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_room_type_for_hotel",
            error.to_string(),
            Value::Null,
        ),
        BookingError::RewardOutOfRange { .. } => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "reward_out_of_range",
            error.to_string(),
            Value::Null,
        ),
        BookingError::AgentNotFound(_)
        | BookingError::HotelNotFound(_)
        | BookingError::RoomTypeNotFound(_)
        | BookingError::BookingNotFound(_) => error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            error.to_string(),
            Value::Null,
        ),
        BookingError::AgentInactive(_)
        | BookingError::HotelInactive(_)
        | BookingError::RoomTypeInactive(_) => error_response(
            StatusCode::CONFLICT,
            "inactive",
            error.to_string(),
            Value::Null,
        ),
        BookingError::InvalidTransition { from, to } => error_response(
            StatusCode::CONFLICT,
            "invalid_transition",
            error.to_string(),
            json!({ "from": from, "to": to }),
        ),
        BookingError::Repository(inner) => repository_error_response(inner),
    }
}
