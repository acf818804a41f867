use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::ids::{AgentId, HotelId, IdentityId, RoomTypeId};
use crate::store::MemoryStore;
use crate::workflows::bookings::{BookingRequest, BookingService};
use crate::workflows::catalog::{CatalogRepository, Hotel, RoomType};
use crate::workflows::onboarding::{Agent, AgentRepository, AgencySnapshot};

pub(super) struct Fixture {
    pub(super) service: Arc<BookingService<MemoryStore>>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) agent: Agent,
    pub(super) hotel: Hotel,
    pub(super) room: RoomType,
}

pub(super) async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::default());
    let agent = store
        .insert_agent(agent("tevita@example.com"))
        .await
        .expect("agent stored");
    let hotel = store
        .insert_hotel(hotel("Tokoriki Island Resort"))
        .await
        .expect("hotel stored");
    let room = store
        .insert_room_type(room_type(hotel.id, "Beachfront Bure", Decimal::new(5, 0)))
        .await
        .expect("room stored");

    Fixture {
        service: Arc::new(BookingService::new(store.clone())),
        store,
        agent,
        hotel,
        room,
    }
}

pub(super) fn agent(email: &str) -> Agent {
    Agent {
        id: AgentId::generate(),
        identity_id: IdentityId::generate(),
        first_name: "Tevita".to_string(),
        last_name: "Fifita".to_string(),
        email: email.to_string(),
        telephone: None,
        agency_id: None,
        agency: AgencySnapshot::default(),
        is_active: true,
        booking_count: 0,
        created_at: Utc::now(),
    }
}

pub(super) fn hotel(name: &str) -> Hotel {
    Hotel {
        id: HotelId::generate(),
        name: name.to_string(),
        address: "Mamanuca Group".to_string(),
        city: "Tokoriki".to_string(),
        country: "Fiji".to_string(),
        zip_code: "FJ-400".to_string(),
        email: None,
        telephone: None,
        star_rating: 5,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub(super) fn room_type(hotel_id: HotelId, name: &str, points_per_night: Decimal) -> RoomType {
    RoomType {
        id: RoomTypeId::generate(),
        hotel_id,
        name: name.to_string(),
        category: "villa".to_string(),
        points_per_night,
        max_occupancy: 2,
        base_price: None,
        is_active: true,
    }
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn request(fixture: &Fixture) -> BookingRequest {
    BookingRequest {
        agent_id: Some(fixture.agent.id),
        hotel_id: Some(fixture.hotel.id),
        room_type_id: Some(fixture.room.id),
        arrival_date: Some(date(2026, 7, 10)),
        departure_date: Some(date(2026, 7, 13)),
        guest_name: Some("Salote Tupou".to_string()),
        external_reference: Some(" PMS-88812 ".to_string()),
    }
}

/// The fixture agent has no stored bookings and an untouched booking counter.
pub(super) async fn assert_nothing_booked(fixture: &Fixture) {
    let bookings = fixture
        .service
        .list_agent_bookings(&reviewer(), fixture.agent.id)
        .await
        .expect("bookings listed");
    assert!(bookings.is_empty(), "unexpected bookings: {bookings:?}");
    let agent = fixture
        .store
        .fetch_agent(fixture.agent.id)
        .await
        .expect("agent lookup")
        .expect("agent exists");
    assert_eq!(agent.booking_count, 0);
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
