use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{HotelRegistration, RoomTypeRegistration};
use super::repository::CatalogRepository;
use super::service::{CatalogError, CatalogService};
use crate::auth::AuthContext;
use crate::ids::HotelId;
use crate::workflows::{error_response, repository_error_response};

pub fn catalog_router<S>(service: Arc<CatalogService<S>>) -> Router
where
    S: CatalogRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/hotels",
            post(register_hotel_handler::<S>).get(list_hotels_handler::<S>),
        )
        .route(
            "/api/v1/hotels/:hotel_id/room-types",
            post(add_room_type_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListHotelsQuery {
    #[serde(default)]
    active_only: Option<bool>,
}

pub(crate) async fn register_hotel_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    ctx: AuthContext,
    axum::Json(registration): axum::Json<HotelRegistration>,
) -> Response
where
    S: CatalogRepository + 'static,
{
    match service.register_hotel(&ctx, registration).await {
        Ok(hotel) => (StatusCode::CREATED, axum::Json(hotel)).into_response(),
        Err(error) => catalog_error_response(&error),
    }
}

pub(crate) async fn list_hotels_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    Query(query): Query<ListHotelsQuery>,
) -> Response
where
    S: CatalogRepository + 'static,
{
    match service.list_hotels(query.active_only.unwrap_or(true)).await {
        Ok(hotels) => (StatusCode::OK, axum::Json(json!({ "hotels": hotels }))).into_response(),
        Err(error) => catalog_error_response(&error),
    }
}

pub(crate) async fn add_room_type_handler<S>(
    State(service): State<Arc<CatalogService<S>>>,
    ctx: AuthContext,
    Path(hotel_id): Path<HotelId>,
    axum::Json(registration): axum::Json<RoomTypeRegistration>,
) -> Response
where
    S: CatalogRepository + 'static,
{
    match service.add_room_type(&ctx, hotel_id, registration).await {
        Ok(room_type) => (StatusCode::CREATED, axum::Json(room_type)).into_response(),
        Err(error) => catalog_error_response(&error),
    }
}

fn catalog_error_response(error: &CatalogError) -> Response {
    match error {
        CatalogError::Forbidden(denied) => error_response(
            StatusCode::FORBIDDEN,
            "forbidden",
            denied.to_string(),
            Value::Null,
        ),
        CatalogError::Invalid { field, .. } => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_failed",
            error.to_string(),
            json!({ "field": field }),
        ),
        CatalogError::HotelNotFound(hotel_id) => error_response(
            StatusCode::NOT_FOUND,
            "hotel_not_found",
            error.to_string(),
            json!({ "hotel_id": hotel_id }),
        ),
        CatalogError::Repository(inner) => repository_error_response(inner),
    }
}
