use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::{HotelId, RoomTypeId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotel {
    pub id: HotelId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub zip_code: String,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub star_rating: u8,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Bookable room category owned by a hotel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomType {
    pub id: RoomTypeId,
    pub hotel_id: HotelId,
    pub name: String,
    pub category: String,
    pub points_per_night: Decimal,
    pub max_occupancy: u16,
    pub base_price: Option<Decimal>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelListing {
    #[serde(flatten)]
    pub hotel: Hotel,
    pub room_types: Vec<RoomType>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelRegistration {
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub city: String,
    pub country: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    pub star_rating: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomTypeRegistration {
    pub name: String,
    pub category: String,
    pub points_per_night: Decimal,
    pub max_occupancy: u16,
    #[serde(default)]
    pub base_price: Option<Decimal>,
}
