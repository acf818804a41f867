use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;

use super::domain::{Hotel, HotelListing, HotelRegistration, RoomType, RoomTypeRegistration};
use super::repository::CatalogRepository;
use crate::auth::{AccessDenied, AuthContext};
use crate::ids::{HotelId, RoomTypeId};
use crate::repository::RepositoryError;

/// Upper bound on a room type's nightly rate.
pub const MAX_POINTS_PER_NIGHT: Decimal = dec!(100000);

pub struct CatalogService<S> {
    repository: Arc<S>,
}

impl<S> CatalogService<S>
where
    S: CatalogRepository + 'static,
{
    pub fn new(repository: Arc<S>) -> Self {
        Self { repository }
    }

    pub async fn register_hotel(
        &self,
        ctx: &AuthContext,
        registration: HotelRegistration,
    ) -> Result<Hotel, CatalogError> {
        ctx.require_catalog_manager("register hotels")?;

        let name = required("name", &registration.name)?;
        let city = required("city", &registration.city)?;
        let country = required("country", &registration.country)?;
        if !(1..=5).contains(&registration.star_rating) {
            return Err(CatalogError::Invalid {
                field: "star_rating",
                reason: "must be between 1 and 5",
            });
        }

        let hotel = Hotel {
            id: HotelId::generate(),
            name,
            address: registration.address.trim().to_string(),
            city,
            country,
            zip_code: registration.zip_code.trim().to_string(),
            email: registration.email.map(|email| email.trim().to_ascii_lowercase()),
            telephone: registration.telephone,
            star_rating: registration.star_rating,
            is_active: true,
            created_at: Utc::now(),
        };

        let stored = self.repository.insert_hotel(hotel).await?;
        info!(hotel_id = %stored.id, name = %stored.name, "hotel registered");
        Ok(stored)
    }

    pub async fn add_room_type(
        &self,
        ctx: &AuthContext,
        hotel_id: HotelId,
        registration: RoomTypeRegistration,
    ) -> Result<RoomType, CatalogError> {
        ctx.require_catalog_manager("add room types")?;

        let name = required("name", &registration.name)?;
        let category = required("category", &registration.category)?;
        if registration.points_per_night < Decimal::ZERO {
            return Err(CatalogError::Invalid {
                field: "points_per_night",
                reason: "must not be negative",
            });
        }
        if registration.points_per_night > MAX_POINTS_PER_NIGHT {
            return Err(CatalogError::Invalid {
                field: "points_per_night",
                reason: "must not exceed 100000",
            });
        }
        if registration.max_occupancy == 0 {
            return Err(CatalogError::Invalid {
                field: "max_occupancy",
                reason: "must be at least 1",
            });
        }

        if self.repository.fetch_hotel(hotel_id).await?.is_none() {
            return Err(CatalogError::HotelNotFound(hotel_id));
        }

        let room_type = RoomType {
            id: RoomTypeId::generate(),
            hotel_id,
            name,
            category,
            points_per_night: registration.points_per_night,
            max_occupancy: registration.max_occupancy,
            base_price: registration.base_price,
            is_active: true,
        };

        let stored = self.repository.insert_room_type(room_type).await?;
        info!(
            hotel_id = %hotel_id,
            room_type_id = %stored.id,
            points_per_night = %stored.points_per_night,
            "room type added"
        );
        Ok(stored)
    }

    pub async fn list_hotels(&self, active_only: bool) -> Result<Vec<HotelListing>, CatalogError> {
        Ok(self.repository.list_hotels(active_only).await?)
    }
}

fn required(field: &'static str, value: &str) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Invalid {
            field,
            reason: "is required",
        });
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("{field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    #[error("hotel {0} not found")]
    HotelNotFound(HotelId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
