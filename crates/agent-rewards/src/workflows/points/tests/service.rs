use rust_decimal_macros::dec;
use uuid::Uuid;

use super::common::*;
use crate::auth::AuthContext;
use crate::ids::{AgentId, RedemptionId};
use crate::workflows::bookings::VerificationStatus;
use crate::workflows::onboarding::AgentRepository;
use crate::workflows::points::{
    PointsError, QuoteError, RedemptionRequest, RedemptionStatus, CASH_REDEMPTION,
};

fn cash(points: rust_decimal::Decimal) -> RedemptionRequest {
    RedemptionRequest {
        points,
        voucher_code: None,
    }
}

#[tokio::test]
async fn nine_points_cannot_be_redeemed() {
    let fixture = fixture_with(&[dec!(4), dec!(5)]).await;

    let balance = fixture
        .service
        .balance(&owner(&fixture), fixture.agent.id)
        .await
        .expect("balance");
    assert_eq!(balance.available_points, dec!(9));
    assert!(!balance.can_redeem);
    assert_eq!(balance.next_threshold, dec!(10));

    let result = fixture
        .service
        .redeem(&owner(&fixture), fixture.agent.id, cash(dec!(9)))
        .await;
    assert!(matches!(
        result,
        Err(PointsError::Quote(QuoteError::BelowMinimum { minimum })) if minimum == dec!(10)
    ));
}

#[tokio::test]
async fn redemption_reserves_points_until_settled() {
    let fixture = fixture_with(&[dec!(15)]).await;
    let agent = owner(&fixture);

    let redemption = fixture
        .service
        .redeem(&agent, fixture.agent.id, cash(dec!(10)))
        .await
        .expect("redeemed");
    assert_eq!(redemption.status, RedemptionStatus::Pending);
    assert_eq!(redemption.redemption_type, CASH_REDEMPTION);
    assert_eq!(redemption.redemption_value, dec!(0.10));

    let balance = fixture
        .service
        .balance(&agent, fixture.agent.id)
        .await
        .expect("balance");
    assert_eq!(balance.total_earned, dec!(15));
    assert_eq!(balance.pending_redemptions, dec!(10));
    assert_eq!(balance.total_redeemed, dec!(0));
    assert_eq!(balance.available_points, dec!(5));
    assert!(!balance.can_redeem);

    let second = fixture
        .service
        .redeem(&agent, fixture.agent.id, cash(dec!(10)))
        .await;
    match second {
        Err(PointsError::InsufficientPoints {
            requested,
            available,
        }) => {
            assert_eq!(requested, dec!(10));
            assert_eq!(available, dec!(5));
        }
        other => panic!("expected insufficient points, got {other:?}"),
    }
}

#[tokio::test]
async fn completion_moves_points_to_redeemed() {
    let fixture = fixture_with(&[dec!(15)]).await;
    let redemption = fixture
        .service
        .redeem(&owner(&fixture), fixture.agent.id, cash(dec!(10)))
        .await
        .expect("redeemed");
    let reviewer = reviewer();

    let completed = fixture
        .service
        .complete_redemption(&reviewer, redemption.id, Some(" paid by transfer ".to_string()))
        .await
        .expect("completed");
    assert_eq!(completed.status, RedemptionStatus::Completed);
    assert_eq!(completed.processed_by, Some(reviewer.actor_id));
    assert_eq!(completed.notes.as_deref(), Some("paid by transfer"));

    let balance = fixture
        .service
        .balance(&reviewer, fixture.agent.id)
        .await
        .expect("balance");
    assert_eq!(balance.total_redeemed, dec!(10));
    assert_eq!(balance.pending_redemptions, dec!(0));
    assert_eq!(balance.available_points, dec!(5));
}

#[tokio::test]
async fn rejection_releases_reserved_points() {
    let fixture = fixture_with(&[dec!(15)]).await;
    let redemption = fixture
        .service
        .redeem(&owner(&fixture), fixture.agent.id, cash(dec!(10)))
        .await
        .expect("redeemed");

    fixture
        .service
        .reject_redemption(&reviewer(), redemption.id, None)
        .await
        .expect("rejected");

    let balance = fixture
        .service
        .balance(&owner(&fixture), fixture.agent.id)
        .await
        .expect("balance");
    assert_eq!(balance.available_points, dec!(15));
    assert!(balance.can_redeem);
    assert_eq!(balance.next_threshold, dec!(20));
}

#[tokio::test]
async fn settled_redemption_reports_current_status() {
    let fixture = fixture_with(&[dec!(30)]).await;
    let redemption = fixture
        .service
        .redeem(&owner(&fixture), fixture.agent.id, cash(dec!(12)))
        .await
        .expect("redeemed");
    fixture
        .service
        .complete_redemption(&reviewer(), redemption.id, None)
        .await
        .expect("completed");

    let result = fixture
        .service
        .reject_redemption(&reviewer(), redemption.id, None)
        .await;

    assert!(matches!(
        result,
        Err(PointsError::AlreadyProcessed {
            status: RedemptionStatus::Completed,
            ..
        })
    ));
}

#[tokio::test]
async fn unknown_redemption_is_not_found() {
    let fixture = fixture_with(&[]).await;
    let missing = RedemptionId::generate();

    let result = fixture
        .service
        .complete_redemption(&reviewer(), missing, None)
        .await;

    assert!(matches!(result, Err(PointsError::RedemptionNotFound(id)) if id == missing));
}

#[tokio::test]
async fn only_approved_bookings_count() {
    let fixture = fixture_with(&[dec!(20)]).await;
    earn(&fixture.store, fixture.agent.id, dec!(40), VerificationStatus::Pending).await;
    earn(&fixture.store, fixture.agent.id, dec!(40), VerificationStatus::Rejected).await;

    let balance = fixture
        .service
        .balance(&owner(&fixture), fixture.agent.id)
        .await
        .expect("balance");

    assert_eq!(balance.total_earned, dec!(20));
}

#[tokio::test]
async fn vouchers_use_their_own_rate_and_cap() {
    let fixture = fixture_with(&[dec!(20000)]).await;

    let amazon = fixture
        .service
        .redeem(
            &owner(&fixture),
            fixture.agent.id,
            RedemptionRequest {
                points: dec!(15000),
                voucher_code: Some("AMAZON".to_string()),
            },
        )
        .await
        .expect("voucher redeemed");
    assert_eq!(amazon.redemption_type, "amazon");
    assert_eq!(amazon.redemption_value, dec!(100));

    let dining = fixture
        .service
        .redeem(
            &owner(&fixture),
            fixture.agent.id,
            RedemptionRequest {
                points: dec!(20),
                voucher_code: Some("dining".to_string()),
            },
        )
        .await;
    assert!(matches!(
        dining,
        Err(PointsError::Quote(QuoteError::BelowVoucherMinimum { .. }))
    ));

    let unknown = fixture
        .service
        .redeem(
            &owner(&fixture),
            fixture.agent.id,
            RedemptionRequest {
                points: dec!(100),
                voucher_code: Some("spa".to_string()),
            },
        )
        .await;
    assert!(matches!(
        unknown,
        Err(PointsError::Quote(QuoteError::UnknownVoucher(code))) if code == "spa"
    ));
}

#[tokio::test]
async fn inactive_agent_cannot_redeem() {
    let fixture = fixture_with(&[dec!(50)]).await;
    let mut agent = fixture.agent.clone();
    agent.is_active = false;
    fixture.store.update_agent(agent).await.expect("update");

    let result = fixture
        .service
        .redeem(&reviewer(), fixture.agent.id, cash(dec!(10)))
        .await;

    assert!(matches!(result, Err(PointsError::AgentInactive(_))));
}

#[tokio::test]
async fn agents_only_see_their_own_points() {
    let fixture = fixture_with(&[dec!(50)]).await;
    let other = AuthContext::agent(Uuid::new_v4(), AgentId::generate());

    let result = fixture.service.balance(&other, fixture.agent.id).await;

    assert!(matches!(result, Err(PointsError::Forbidden(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemptions_never_overdraw() {
    let fixture = fixture_with(&[dec!(50)]).await;
    let agent_id = fixture.agent.id;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = fixture.service.clone();
        let ctx = owner(&fixture);
        handles.push(tokio::spawn(async move {
            service.redeem(&ctx, agent_id, cash(dec!(20))).await
        }));
    }

    let mut reserved = 0;
    for handle in handles {
        match handle.await.expect("task joins") {
            Ok(_) => reserved += 1,
            Err(PointsError::InsufficientPoints { .. }) => {}
            Err(other) => panic!("unexpected error {other}"),
        }
    }

    assert_eq!(reserved, 2);
    let balance = fixture
        .service
        .balance(&reviewer(), agent_id)
        .await
        .expect("balance");
    assert_eq!(balance.pending_redemptions, dec!(40));
    assert_eq!(balance.available_points, dec!(10));
}

#[tokio::test]
async fn oversized_totals_fail_without_breaking_the_store() {
    let huge = rust_decimal::Decimal::MAX / dec!(2) + dec!(1);
    let fixture = fixture_with(&[huge, huge]).await;

    for _ in 0..2 {
        let result = fixture
            .service
            .balance(&owner(&fixture), fixture.agent.id)
            .await;
        match result {
            Err(PointsError::Repository(crate::repository::RepositoryError::Unavailable(reason))) => {
                assert_eq!(reason, "points total out of range");
            }
            other => panic!("expected out of range total, got {other:?}"),
        }
    }

    let redemptions = fixture
        .service
        .list_redemptions(&owner(&fixture), fixture.agent.id)
        .await
        .expect("store still usable");
    assert!(redemptions.is_empty());
}
