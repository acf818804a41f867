//! Hotels and the room types whose nightly point rates drive booking rewards.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{Hotel, HotelListing, HotelRegistration, RoomType, RoomTypeRegistration};
pub use repository::CatalogRepository;
pub use router::catalog_router;
pub use service::{CatalogError, CatalogService, MAX_POINTS_PER_NIGHT};
