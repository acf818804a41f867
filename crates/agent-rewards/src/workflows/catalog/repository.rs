use async_trait::async_trait;

use super::domain::{Hotel, HotelListing, RoomType};
use crate::ids::{HotelId, RoomTypeId};
use crate::repository::RepositoryError;

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn insert_hotel(&self, hotel: Hotel) -> Result<Hotel, RepositoryError>;
    /// Fails with `NotFound` when the owning hotel does not exist.
    async fn insert_room_type(&self, room_type: RoomType) -> Result<RoomType, RepositoryError>;
    async fn fetch_hotel(&self, id: HotelId) -> Result<Option<Hotel>, RepositoryError>;
    async fn fetch_room_type(&self, id: RoomTypeId) -> Result<Option<RoomType>, RepositoryError>;
    /// Hotels ordered by name, each with its room types.
    async fn list_hotels(&self, active_only: bool) -> Result<Vec<HotelListing>, RepositoryError>;
}
