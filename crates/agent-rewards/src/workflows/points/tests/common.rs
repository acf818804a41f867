use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::ids::{AgentId, BookingId, HotelId, IdentityId, RoomTypeId};
use crate::store::MemoryStore;
use crate::workflows::bookings::{Booking, BookingRepository, BookingStatus, VerificationStatus};
use crate::workflows::onboarding::{Agent, AgentRepository, AgencySnapshot};
use crate::workflows::points::{PointsService, RedemptionPolicy};

pub(super) struct Fixture {
    pub(super) service: Arc<PointsService<MemoryStore>>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) agent: Agent,
}

/// Agent whose approved bookings add up to `earned` points.
pub(super) async fn fixture_with(earned: &[Decimal]) -> Fixture {
    let store = Arc::new(MemoryStore::default());
    let agent = store
        .insert_agent(Agent {
            id: AgentId::generate(),
            identity_id: IdentityId::generate(),
            first_name: "Mele".to_string(),
            last_name: "Havili".to_string(),
            email: "mele@example.com".to_string(),
            telephone: None,
            agency_id: None,
            agency: AgencySnapshot::default(),
            is_active: true,
            booking_count: 0,
            created_at: Utc::now(),
        })
        .await
        .expect("agent stored");

    for points in earned {
        earn(&store, agent.id, *points, VerificationStatus::Approved).await;
    }

    Fixture {
        service: Arc::new(PointsService::new(
            store.clone(),
            RedemptionPolicy::default(),
        )),
        store,
        agent,
    }
}

pub(super) async fn earn(
    store: &MemoryStore,
    agent_id: AgentId,
    points: Decimal,
    verification_status: VerificationStatus,
) -> Booking {
    let arrival = NaiveDate::from_ymd_opt(2026, 5, 4).expect("valid date");
    let departure = NaiveDate::from_ymd_opt(2026, 5, 5).expect("valid date");
    store
        .insert_booking(Booking {
            id: BookingId::generate(),
            agent_id,
            hotel_id: HotelId::generate(),
            room_type_id: RoomTypeId::generate(),
            guest_name: "Guest".to_string(),
            arrival_date: arrival,
            departure_date: departure,
            number_of_nights: 1,
            points_per_night: points,
            reward_points: points,
            verification_status,
            booking_status: BookingStatus::Confirmed,
            confirmation_number: format!("BK-SEED-{}", Uuid::new_v4().simple()),
            external_reference: None,
            verified_at: None,
            verified_by: None,
            verification_notes: None,
            created_at: Utc::now(),
        })
        .await
        .expect("booking stored")
}

pub(super) fn reviewer() -> AuthContext {
    AuthContext::admin(Uuid::new_v4())
}

pub(super) fn owner(fixture: &Fixture) -> AuthContext {
    AuthContext::agent(Uuid::new_v4(), fixture.agent.id)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
