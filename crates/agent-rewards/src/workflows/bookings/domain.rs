use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{AgentId, BookingId, HotelId, RoomTypeId};

/// Admin-controlled state of a booking's point award. Only `Approved` bookings count
/// towards the agent's earned points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Review,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Review => "review",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(Self::Pending),
            "review" => Some(Self::Review),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Approved and rejected are terminal so counted points never disappear.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Review | Self::Approved | Self::Rejected)
                | (Self::Review, Self::Approved | Self::Rejected)
        )
    }
}

/// Reservation lifecycle, independent of verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled)
                | (Self::Confirmed, Self::Completed | Self::Cancelled)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub agent_id: AgentId,
    pub hotel_id: HotelId,
    pub room_type_id: RoomTypeId,
    pub guest_name: String,
    pub arrival_date: NaiveDate,
    pub departure_date: NaiveDate,
    pub number_of_nights: u32,
    pub points_per_night: Decimal,
    pub reward_points: Decimal,
    pub verification_status: VerificationStatus,
    pub booking_status: BookingStatus,
    pub confirmation_number: String,
    pub external_reference: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub verification_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Booking joined with the hotel and room type display fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub hotel_name: String,
    pub hotel_city: String,
    pub hotel_country: String,
    pub room_type_name: String,
    pub room_type_category: String,
}

/// Inbound booking. Every field but the external reference is required; missing ones
/// are reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub agent_id: Option<AgentId>,
    #[serde(default)]
    pub hotel_id: Option<HotelId>,
    #[serde(default)]
    pub room_type_id: Option<RoomTypeId>,
    #[serde(default)]
    pub arrival_date: Option<NaiveDate>,
    #[serde(default)]
    pub departure_date: Option<NaiveDate>,
    #[serde(default)]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

/// Verification decision applied with compare-and-set on the previous status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationUpdate {
    pub status: VerificationStatus,
    pub verified_at: DateTime<Utc>,
    pub verified_by: Uuid,
    pub notes: Option<String>,
}

/// Whole nights between arrival and departure; `None` unless departure is later.
pub fn stay_nights(arrival: NaiveDate, departure: NaiveDate) -> Option<u32> {
    let nights = departure.signed_duration_since(arrival).num_days();
    if nights <= 0 {
        return None;
    }
    u32::try_from(nights).ok()
}

/// Exact product; fractional rates are kept, never truncated. `None` on overflow.
pub fn reward_points(points_per_night: Decimal, nights: u32) -> Option<Decimal> {
    points_per_night.checked_mul(Decimal::from(nights))
}

/// `BK-<yyyymmddHHMMSS>-<6 random characters>`.
pub fn confirmation_number(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_ascii_uppercase();
    format!("BK-{}-{}", now.format("%Y%m%d%H%M%S"), suffix)
}
