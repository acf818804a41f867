use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use rust_decimal_macros::dec;
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER, AGENT_ID_HEADER};
use crate::store::MemoryStore;
use crate::workflows::points::router::{balance_handler, redeem_handler};
use crate::workflows::points::{points_router, RedemptionRequest};

#[tokio::test]
async fn balance_handler_reports_available_points() {
    let fixture = fixture_with(&[dec!(12.5), dec!(2.5)]).await;

    let response = balance_handler::<MemoryStore>(
        State(fixture.service.clone()),
        owner(&fixture),
        Path(fixture.agent.id),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let earned = body["total_earned"]
        .as_str()
        .and_then(|raw| raw.parse::<rust_decimal::Decimal>().ok());
    assert_eq!(earned, Some(dec!(15)));
    assert_eq!(body["can_redeem"], true);
}

#[tokio::test]
async fn redeem_handler_returns_conflict_when_short() {
    let fixture = fixture_with(&[dec!(15)]).await;

    let response = redeem_handler::<MemoryStore>(
        State(fixture.service.clone()),
        owner(&fixture),
        Path(fixture.agent.id),
        axum::Json(RedemptionRequest {
            points: dec!(16),
            voucher_code: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "insufficient_points");
    assert_eq!(body["available"], "15");
}

#[tokio::test]
async fn redeem_handler_rejects_amounts_below_minimum() {
    let fixture = fixture_with(&[dec!(15)]).await;

    let response = redeem_handler::<MemoryStore>(
        State(fixture.service.clone()),
        owner(&fixture),
        Path(fixture.agent.id),
        axum::Json(RedemptionRequest {
            points: dec!(5),
            voucher_code: None,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "invalid_amount");
    assert_eq!(body["minimum"], "10");
}

#[tokio::test]
async fn redeem_route_then_complete_route() {
    let fixture = fixture_with(&[dec!(40)]).await;
    let agent = owner(&fixture);
    let router = points_router(fixture.service.clone());

    let created = router
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/agents/{}/redemptions", fixture.agent.id))
                .header(ACTOR_ID_HEADER, agent.actor_id.to_string())
                .header(ACTOR_ROLE_HEADER, "agent")
                .header(AGENT_ID_HEADER, fixture.agent.id.to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "points": "25" }).to_string()))
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(created.status(), StatusCode::CREATED);
    let redemption = read_json_body(created).await;
    assert_eq!(redemption["status"], "pending");
    let redemption_id = redemption["id"].as_str().expect("id").to_string();

    let admin = reviewer();
    let completed = router
        .oneshot(
            Request::post(format!("/api/v1/redemptions/{redemption_id}/complete"))
                .header(ACTOR_ID_HEADER, admin.actor_id.to_string())
                .header(ACTOR_ROLE_HEADER, "admin")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(completed.status(), StatusCode::OK);
    let body = read_json_body(completed).await;
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn agents_cannot_settle_redemptions() {
    let fixture = fixture_with(&[dec!(40)]).await;
    let redemption = fixture
        .service
        .redeem(
            &owner(&fixture),
            fixture.agent.id,
            RedemptionRequest {
                points: dec!(20),
                voucher_code: None,
            },
        )
        .await
        .expect("redeemed");
    let router = points_router(fixture.service.clone());

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/redemptions/{}/complete", redemption.id))
                .header(ACTOR_ID_HEADER, owner(&fixture).actor_id.to_string())
                .header(ACTOR_ROLE_HEADER, "agent")
                .header(AGENT_ID_HEADER, fixture.agent.id.to_string())
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn voucher_catalogue_is_public() {
    let fixture = fixture_with(&[]).await;
    let router = points_router(fixture.service.clone());

    let response = router
        .oneshot(
            Request::get("/api/v1/vouchers")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["minimum_redemption"], "10");
    let codes: Vec<&str> = body["vouchers"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|voucher| voucher["code"].as_str())
        .collect();
    assert_eq!(codes, vec!["amazon", "hotel-credit", "dining"]);
}

#[tokio::test]
async fn agent_header_does_not_grant_other_roles_agent_access() {
    let fixture = fixture_with(&[dec!(40)]).await;
    let router = points_router(fixture.service.clone());

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/agents/{}/redemptions", fixture.agent.id))
                .header(ACTOR_ID_HEADER, uuid::Uuid::new_v4().to_string())
                .header(ACTOR_ROLE_HEADER, "resort_manager")
                .header(AGENT_ID_HEADER, fixture.agent.id.to_string())
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "points": "40" }).to_string()))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let balance = fixture
        .service
        .balance(&reviewer(), fixture.agent.id)
        .await
        .expect("balance");
    assert_eq!(balance.pending_redemptions, dec!(0));
    assert_eq!(balance.available_points, dec!(40));
}
