//! Booking accounting: stays logged by agents, their nightly point rewards and the
//! verification that decides when those points count.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    reward_points, stay_nights, Booking, BookingRequest, BookingStatus, BookingView,
    VerificationStatus, VerificationUpdate,
};
pub use repository::BookingRepository;
pub use router::booking_router;
pub use service::{BookingError, BookingService};
