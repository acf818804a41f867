use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::RedemptionRequest;
use super::ledger::QuoteError;
use super::repository::LedgerRepository;
use super::service::{PointsError, PointsService};
use crate::auth::AuthContext;
use crate::ids::{AgentId, RedemptionId};
use crate::workflows::onboarding::AgentRepository;
use crate::workflows::{error_response, repository_error_response};

pub fn points_router<S>(service: Arc<PointsService<S>>) -> Router
where
    S: LedgerRepository + AgentRepository + 'static,
{
    Router::new()
        .route("/api/v1/agents/:agent_id/points", get(balance_handler::<S>))
        .route(
            "/api/v1/agents/:agent_id/redemptions",
            post(redeem_handler::<S>).get(list_redemptions_handler::<S>),
        )
        .route(
            "/api/v1/redemptions/:redemption_id/complete",
            post(complete_handler::<S>),
        )
        .route(
            "/api/v1/redemptions/:redemption_id/reject",
            post(reject_handler::<S>),
        )
        .route("/api/v1/vouchers", get(vouchers_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SettlementRequest {
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

pub(crate) async fn balance_handler<S>(
    State(service): State<Arc<PointsService<S>>>,
    ctx: AuthContext,
    Path(agent_id): Path<AgentId>,
) -> Response
where
    S: LedgerRepository + AgentRepository + 'static,
{
    match service.balance(&ctx, agent_id).await {
        Ok(balance) => (StatusCode::OK, axum::Json(balance)).into_response(),
        Err(error) => points_error_response(&error),
    }
}

pub(crate) async fn redeem_handler<S>(
    State(service): State<Arc<PointsService<S>>>,
    ctx: AuthContext,
    Path(agent_id): Path<AgentId>,
    axum::Json(request): axum::Json<RedemptionRequest>,
) -> Response
where
    S: LedgerRepository + AgentRepository + 'static,
{
    match service.redeem(&ctx, agent_id, request).await {
        Ok(redemption) => (StatusCode::CREATED, axum::Json(redemption)).into_response(),
        Err(error) => points_error_response(&error),
    }
}

pub(crate) async fn list_redemptions_handler<S>(
    State(service): State<Arc<PointsService<S>>>,
    ctx: AuthContext,
    Path(agent_id): Path<AgentId>,
) -> Response
where
    S: LedgerRepository + AgentRepository + 'static,
{
    match service.list_redemptions(&ctx, agent_id).await {
        Ok(redemptions) => (
            StatusCode::OK,
            axum::Json(json!({ "redemptions": redemptions })),
        )
            .into_response(),
        Err(error) => points_error_response(&error),
    }
}

pub(crate) async fn complete_handler<S>(
    State(service): State<Arc<PointsService<S>>>,
    ctx: AuthContext,
    Path(redemption_id): Path<RedemptionId>,
    request: Option<axum::Json<SettlementRequest>>,
) -> Response
where
    S: LedgerRepository + AgentRepository + 'static,
{
    let notes = request.and_then(|axum::Json(request)| request.notes);
    match service.complete_redemption(&ctx, redemption_id, notes).await {
        Ok(redemption) => (StatusCode::OK, axum::Json(redemption)).into_response(),
        Err(error) => points_error_response(&error),
    }
}

pub(crate) async fn reject_handler<S>(
    State(service): State<Arc<PointsService<S>>>,
    ctx: AuthContext,
    Path(redemption_id): Path<RedemptionId>,
    request: Option<axum::Json<SettlementRequest>>,
) -> Response
where
    S: LedgerRepository + AgentRepository + 'static,
{
    let notes = request.and_then(|axum::Json(request)| request.notes);
    match service.reject_redemption(&ctx, redemption_id, notes).await {
        Ok(redemption) => (StatusCode::OK, axum::Json(redemption)).into_response(),
        Err(error) => points_error_response(&error),
    }
}

pub(crate) async fn vouchers_handler<S>(State(service): State<Arc<PointsService<S>>>) -> Response
where
    S: LedgerRepository + AgentRepository + 'static,
{
    let policy = service.policy();
    (
        StatusCode::OK,
        axum::Json(json!({
            "minimum_redemption": policy.minimum_redemption,
            "point_value": policy.point_value,
            "vouchers": service.voucher_options(),
        })),
    )
        .into_response()
}

pub(crate) fn points_error_response(error: &PointsError) -> Response {
    match error {
        PointsError::Forbidden(_) => error_response(
            StatusCode::FORBIDDEN,
            "forbidden",
            error.to_string(),
            Value::Null,
        ),
        PointsError::Quote(QuoteError::BelowMinimum { minimum }) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_amount",
            error.to_string(),
            json!({ "minimum": minimum }),
        ),
        PointsError::Quote(QuoteError::UnknownVoucher(code)) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "unknown_voucher",
            error.to_string(),
            json!({ "voucher_code": code }),
        ),
        PointsError::Quote(QuoteError::BelowVoucherMinimum { code, minimum }) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "below_voucher_minimum",
            error.to_string(),
            json!({ "voucher_code": code, "minimum": minimum }),
        ),
        PointsError::Quote(QuoteError::TooLarge { .. }) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_amount",
            error.to_string(),
            Value::Null,
        ),
        PointsError::InsufficientPoints {
            requested,
            available,
        } => error_response(
            StatusCode::CONFLICT,
            "insufficient_points",
            error.to_string(),
            json!({ "requested": requested, "available": available }),
        ),
        PointsError::AgentNotFound(_) | PointsError::RedemptionNotFound(_) => error_response(
            StatusCode::NOT_FOUND,
            "not_found",
            error.to_string(),
            Value::Null,
        ),
        PointsError::AgentInactive(_) => error_response(
            StatusCode::CONFLICT,
            "inactive",
            error.to_string(),
            Value::Null,
        ),
        PointsError::AlreadyProcessed { id, status } => error_response(
            StatusCode::CONFLICT,
            "already_processed",
            error.to_string(),
            json!({ "redemption_id": id, "status": status.label() }),
        ),
        PointsError::Repository(inner) => repository_error_response(inner),
    }
}
