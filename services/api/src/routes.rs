use std::sync::atomic::Ordering;
use std::sync::Arc;

use agent_rewards::workflows::bookings::{booking_router, BookingRepository, BookingService};
use agent_rewards::workflows::catalog::{catalog_router, CatalogRepository, CatalogService};
use agent_rewards::workflows::onboarding::{
    onboarding_router, AgencyRepository, AgentRepository, ApplicationRepository,
    IdentityProvider, NotificationSender, OnboardingService,
};
use agent_rewards::workflows::points::{
    points_router, LedgerRepository, PointsService, RedemptionPolicy,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;

use crate::infra::AppState;

/// Every workflow router over one shared store, plus the operational endpoints.
pub(crate) fn rewards_app<S, I, N>(
    store: Arc<S>,
    identities: Arc<I>,
    notifier: Arc<N>,
    policy: RedemptionPolicy,
) -> Router
where
    S: AgencyRepository
        + AgentRepository
        + ApplicationRepository
        + CatalogRepository
        + BookingRepository
        + LedgerRepository
        + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    let onboarding = Arc::new(OnboardingService::new(store.clone(), identities, notifier));
    let catalog = Arc::new(CatalogService::new(store.clone()));
    let bookings = Arc::new(BookingService::new(store.clone()));
    let points = Arc::new(PointsService::new(store, policy));

    Router::new()
        .merge(onboarding_router(onboarding))
        .merge(catalog_router(catalog))
        .merge(booking_router(bookings))
        .merge(points_router(points))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    if state.readiness.load(Ordering::Acquire) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_rewards::store::{MemoryIdentityProvider, MemoryOutbox, MemoryStore};
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> (Router, Arc<AtomicBool>) {
        let readiness = Arc::new(AtomicBool::new(ready));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let router = rewards_app(
            Arc::new(MemoryStore::default()),
            Arc::new(MemoryIdentityProvider::default()),
            Arc::new(MemoryOutbox::default()),
            RedemptionPolicy::default(),
        )
        .layer(Extension(state));
        (router, readiness)
    }

    async fn get_json(router: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).expect("json payload"))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let (router, readiness) = app(false);

        let (status, body) = get_json(&router, "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        readiness.store(true, Ordering::Release);
        let (status, body) = get_json(&router, "/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn workflow_routes_are_mounted() {
        let (router, _) = app(true);

        let (status, body) = get_json(&router, "/api/v1/vouchers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vouchers"].as_array().map(Vec::len), Some(3));

        let (status, body) = get_json(&router, "/api/v1/hotels").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["hotels"].as_array().is_some_and(Vec::is_empty));
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_text() {
        let (router, _) = app(true);

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request builds"))
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
