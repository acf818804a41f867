use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::{ApplicationResult, ApplicationStatus, ApplicationSubmission};
use super::repository::{
    AgencyRepository, AgentRepository, ApplicationRepository, IdentityProvider, NotificationSender,
};
use super::service::{OnboardingError, OnboardingService};
use crate::auth::AuthContext;
use crate::ids::{AgencyId, AgentId, ApplicationId};
use crate::workflows::{error_response, repository_error_response};

pub fn onboarding_router<S, I, N>(service: Arc<OnboardingService<S, I, N>>) -> Router
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    Router::new()
        .route("/api/v1/agencies/search", get(search_agencies_handler::<S, I, N>))
        .route(
            "/api/v1/agencies/:agency_id/active",
            put(set_agency_active_handler::<S, I, N>),
        )
        .route(
            "/api/v1/applications",
            post(submit_handler::<S, I, N>).get(list_applications_handler::<S, I, N>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_handler::<S, I, N>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<S, I, N>),
        )
        .route(
            "/api/v1/agents/:agent_id/agency",
            put(assign_agency_handler::<S, I, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListApplicationsQuery {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReviewRequest {
    #[serde(default)]
    pub(crate) notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AgencyActiveRequest {
    pub(crate) is_active: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignAgencyRequest {
    #[serde(default)]
    pub(crate) agency_id: Option<AgencyId>,
}

pub(crate) async fn search_agencies_handler<S, I, N>(
    State(service): State<Arc<OnboardingService<S, I, N>>>,
    Query(query): Query<SearchQuery>,
) -> Response
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    match service.search_agencies(&query.q).await {
        Ok(agencies) => (StatusCode::OK, axum::Json(json!({ "agencies": agencies }))).into_response(),
        Err(error) => onboarding_error_response(&error),
    }
}

pub(crate) async fn set_agency_active_handler<S, I, N>(
    State(service): State<Arc<OnboardingService<S, I, N>>>,
    ctx: AuthContext,
    Path(agency_id): Path<AgencyId>,
    axum::Json(request): axum::Json<AgencyActiveRequest>,
) -> Response
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    match service
        .set_agency_active(&ctx, agency_id, request.is_active)
        .await
    {
        Ok(agency) => (StatusCode::OK, axum::Json(agency)).into_response(),
        Err(error) => onboarding_error_response(&error),
    }
}

pub(crate) async fn submit_handler<S, I, N>(
    State(service): State<Arc<OnboardingService<S, I, N>>>,
    axum::Json(submission): axum::Json<ApplicationSubmission>,
) -> Response
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    match service.submit_application(submission).await {
        Ok(result) => {
            let status = match &result {
                ApplicationResult::Submitted { .. } => StatusCode::CREATED,
                ApplicationResult::DuplicateEmail { .. }
                | ApplicationResult::DuplicateAgentEmail { .. } => StatusCode::CONFLICT,
                ApplicationResult::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, axum::Json(result)).into_response()
        }
        Err(error) => onboarding_error_response(&error),
    }
}

pub(crate) async fn list_applications_handler<S, I, N>(
    State(service): State<Arc<OnboardingService<S, I, N>>>,
    ctx: AuthContext,
    Query(query): Query<ListApplicationsQuery>,
) -> Response
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match ApplicationStatus::parse(raw) {
            Some(status) => Some(status),
            None => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_status",
                    format!("unknown application status '{raw}'"),
                    Value::Null,
                )
            }
        },
    };

    match service.list_applications(&ctx, status).await {
        Ok(applications) => (
            StatusCode::OK,
            axum::Json(json!({ "applications": applications })),
        )
            .into_response(),
        Err(error) => onboarding_error_response(&error),
    }
}

pub(crate) async fn approve_handler<S, I, N>(
    State(service): State<Arc<OnboardingService<S, I, N>>>,
    ctx: AuthContext,
    Path(application_id): Path<ApplicationId>,
    request: Option<axum::Json<ReviewRequest>>,
) -> Response
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    let notes = request.and_then(|axum::Json(request)| request.notes);
    match service.approve_application(&ctx, application_id, notes).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => onboarding_error_response(&error),
    }
}

pub(crate) async fn reject_handler<S, I, N>(
    State(service): State<Arc<OnboardingService<S, I, N>>>,
    ctx: AuthContext,
    Path(application_id): Path<ApplicationId>,
    request: Option<axum::Json<ReviewRequest>>,
) -> Response
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    let notes = request.and_then(|axum::Json(request)| request.notes);
    match service.reject_application(&ctx, application_id, notes).await {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => onboarding_error_response(&error),
    }
}

pub(crate) async fn assign_agency_handler<S, I, N>(
    State(service): State<Arc<OnboardingService<S, I, N>>>,
    ctx: AuthContext,
    Path(agent_id): Path<AgentId>,
    axum::Json(request): axum::Json<AssignAgencyRequest>,
) -> Response
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    match service
        .assign_agent_to_agency(&ctx, agent_id, request.agency_id)
        .await
    {
        Ok(agent) => (StatusCode::OK, axum::Json(agent)).into_response(),
        Err(error) => onboarding_error_response(&error),
    }
}

pub(crate) fn onboarding_error_response(error: &OnboardingError) -> Response {
    match error {
        OnboardingError::Forbidden(_) => error_response(
            StatusCode::FORBIDDEN,
            "forbidden",
            error.to_string(),
            Value::Null,
        ),
        OnboardingError::EmptyQuery => error_response(
            StatusCode::BAD_REQUEST,
            "invalid_query",
            error.to_string(),
            Value::Null,
        ),
        OnboardingError::ApplicationNotFound(id) => error_response(
            StatusCode::NOT_FOUND,
            "application_not_found",
            error.to_string(),
            json!({ "application_id": id }),
        ),
        OnboardingError::AlreadyProcessed { id, status } => error_response(
            StatusCode::CONFLICT,
            "already_processed",
            error.to_string(),
            json!({ "application_id": id, "status": status.label() }),
        ),
        OnboardingError::AgentNotFound(id) => error_response(
            StatusCode::NOT_FOUND,
            "agent_not_found",
            error.to_string(),
            json!({ "agent_id": id }),
        ),
        OnboardingError::AgencyNotFound(id) => error_response(
            StatusCode::NOT_FOUND,
            "agency_not_found",
            error.to_string(),
            json!({ "agency_id": id }),
        ),
        OnboardingError::AgencyInactive(id) => error_response(
            StatusCode::CONFLICT,
            "agency_inactive",
            error.to_string(),
            json!({ "agency_id": id }),
        ),
        OnboardingError::AgentEmailTaken { .. } => error_response(
            StatusCode::CONFLICT,
            "agent_email_taken",
            error.to_string(),
            Value::Null,
        ),
        OnboardingError::IdentityProvisioning(_) => error_response(
            StatusCode::BAD_GATEWAY,
            "identity_provisioning_failed",
            error.to_string(),
            Value::Null,
        ),
        OnboardingError::AgentRecordFailed { identity_id, .. } => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "agent_record_failed",
            "agent account created but the agent record could not be stored".to_string(),
            json!({ "identity_id": identity_id }),
        ),
        OnboardingError::Repository(inner) => repository_error_response(inner),
    }
}
