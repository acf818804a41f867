//! Core workflows of the incentive program, each split into domain types, storage
//! traits, a service enforcing the invariants and an axum router.

pub mod bookings;
pub mod catalog;
pub mod onboarding;
pub mod points;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

/// JSON error body shared by the workflow routers: `{ "error": code, "message": ... }`
/// merged with any extra context fields.
pub(crate) fn error_response(status: StatusCode, code: &str, message: String, context: Value) -> Response {
    let mut payload = json!({
        "error": code,
        "message": message,
    });
    if let (Some(body), Value::Object(extra)) = (payload.as_object_mut(), context) {
        body.extend(extra);
    }
    (status, axum::Json(payload)).into_response()
}

pub(crate) fn repository_error_response(error: &crate::repository::RepositoryError) -> Response {
    use crate::repository::RepositoryError;

    match error {
        RepositoryError::NotFound => error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            error.to_string(),
            Value::Null,
        ),
        RepositoryError::Conflict => error_response(
            StatusCode::CONFLICT,
            "conflict",
            error.to_string(),
            Value::Null,
        ),
        RepositoryError::Unavailable(_) => {
            tracing::error!(%error, "storage failure while handling request");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_unavailable",
                "storage temporarily unavailable".to_string(),
                Value::Null,
            )
        }
    }
}
