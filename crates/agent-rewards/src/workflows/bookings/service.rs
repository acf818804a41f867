use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{
    confirmation_number, reward_points, stay_nights, Booking, BookingRequest, BookingStatus,
    BookingView, VerificationStatus, VerificationUpdate,
};
use super::repository::BookingRepository;
use crate::auth::{AccessDenied, AuthContext};
use crate::ids::{AgentId, BookingId, HotelId, RoomTypeId};
use crate::repository::RepositoryError;
use crate::workflows::catalog::CatalogRepository;
use crate::workflows::onboarding::AgentRepository;

const CONFIRMATION_ATTEMPTS: usize = 3;

pub struct BookingService<S> {
    store: Arc<S>,
}

impl<S> BookingService<S>
where
    S: BookingRepository + CatalogRepository + AgentRepository + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn create_booking(
        &self,
        ctx: &AuthContext,
        request: BookingRequest,
    ) -> Result<BookingView, BookingError> {
        let guest_name = request
            .guest_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let (agent_id, hotel_id, room_type_id, arrival, departure, guest_name) = match (
            request.agent_id,
            request.hotel_id,
            request.room_type_id,
            request.arrival_date,
            request.departure_date,
            guest_name,
        ) {
            (Some(agent), Some(hotel), Some(room), Some(arrival), Some(departure), Some(guest)) => {
                (agent, hotel, room, arrival, departure, guest)
            }
            (agent, hotel, room, arrival, departure, guest) => {
                let missing = [
                    ("agent_id", agent.is_none()),
                    ("hotel_id", hotel.is_none()),
                    ("room_type_id", room.is_none()),
                    ("arrival_date", arrival.is_none()),
                    ("departure_date", departure.is_none()),
                    ("guest_name", guest.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, absent)| absent.then_some(field))
                .collect();
                return Err(BookingError::MissingFields(missing));
            }
        };

        ctx.require_agent_access(agent_id, "create bookings")?;

        let nights = stay_nights(arrival, departure).ok_or(BookingError::InvalidDateRange {
            arrival,
            departure,
        })?;

        let agent = self
            .store
            .fetch_agent(agent_id)
            .await?
            .ok_or(BookingError::AgentNotFound(agent_id))?;
        if !agent.is_active {
            return Err(BookingError::AgentInactive(agent_id));
        }

        let hotel = self
            .store
            .fetch_hotel(hotel_id)
            .await?
            .ok_or(BookingError::HotelNotFound(hotel_id))?;
        let room_type = self
            .store
            .fetch_room_type(room_type_id)
            .await?
            .ok_or(BookingError::RoomTypeNotFound(room_type_id))?;
        if room_type.hotel_id != hotel.id {
            return Err(BookingError::InvalidRoomTypeForHotel {
                room_type_id,
                hotel_id,
            });
        }
        if !hotel.is_active {
            return Err(BookingError::HotelInactive(hotel_id));
        }
        if !room_type.is_active {
            return Err(BookingError::RoomTypeInactive(room_type_id));
        }

        let external_reference = request
            .external_reference
            .map(|reference| reference.trim().to_string())
            .filter(|reference| !reference.is_empty());
        let points = reward_points(room_type.points_per_night, nights).ok_or(
            BookingError::RewardOutOfRange {
                points_per_night: room_type.points_per_night,
                nights,
            },
        )?;
        let now = Utc::now();
        let mut booking = Booking {
            id: BookingId::generate(),
            agent_id,
            hotel_id,
            room_type_id,
            guest_name,
            arrival_date: arrival,
            departure_date: departure,
            number_of_nights: nights,
            points_per_night: room_type.points_per_night,
            reward_points: points,
            verification_status: VerificationStatus::Pending,
            booking_status: BookingStatus::Confirmed,
            confirmation_number: confirmation_number(now),
            external_reference,
            verified_at: None,
            verified_by: None,
            verification_notes: None,
            created_at: now,
        };

        let mut attempt = 1;
        let stored = loop {
            match self.store.insert_booking(booking.clone()).await {
                Ok(stored) => break stored,
                Err(RepositoryError::Conflict) if attempt < CONFIRMATION_ATTEMPTS => {
                    warn!(
                        confirmation_number = %booking.confirmation_number,
                        attempt,
                        "confirmation number collision; regenerating"
                    );
                    booking.confirmation_number = confirmation_number(Utc::now());
                    attempt += 1;
                }
                Err(RepositoryError::NotFound) => return Err(BookingError::AgentNotFound(agent_id)),
                Err(err) => return Err(err.into()),
            }
        };

        info!(
            booking_id = %stored.id,
            agent_id = %agent_id,
            confirmation_number = %stored.confirmation_number,
            nights,
            reward_points = %stored.reward_points,
            "booking created"
        );

        Ok(BookingView {
            booking: stored,
            hotel_name: hotel.name,
            hotel_city: hotel.city,
            hotel_country: hotel.country,
            room_type_name: room_type.name,
            room_type_category: room_type.category,
        })
    }

    pub async fn list_agent_bookings(
        &self,
        ctx: &AuthContext,
        agent_id: AgentId,
    ) -> Result<Vec<BookingView>, BookingError> {
        ctx.require_agent_access(agent_id, "list bookings")?;
        Ok(self.store.list_agent_bookings(agent_id).await?)
    }

    pub async fn verify_booking(
        &self,
        ctx: &AuthContext,
        booking_id: BookingId,
        status: VerificationStatus,
        notes: Option<String>,
    ) -> Result<Booking, BookingError> {
        ctx.require_reviewer("verify bookings")?;

        let booking = self.booking(booking_id).await?;
        let current = booking.verification_status;
        if !current.can_transition_to(status) {
            return Err(BookingError::InvalidTransition {
                from: current.label(),
                to: status.label(),
            });
        }

        let update = VerificationUpdate {
            status,
            verified_at: Utc::now(),
            verified_by: ctx.actor_id,
            notes: notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
        };
        match self
            .store
            .update_verification(booking_id, current, update)
            .await
        {
            Ok(updated) => {
                info!(
                    booking_id = %booking_id,
                    from = current.label(),
                    to = status.label(),
                    reward_points = %updated.reward_points,
                    reviewer = %ctx.actor_id,
                    "booking verification updated"
                );
                Ok(updated)
            }
            Err(RepositoryError::Conflict) => {
                let latest = self.booking(booking_id).await?;
                Err(BookingError::InvalidTransition {
                    from: latest.verification_status.label(),
                    to: status.label(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Agents may cancel or complete their own bookings; reviewers any booking.
    pub async fn update_booking_status(
        &self,
        ctx: &AuthContext,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> Result<Booking, BookingError> {
        let booking = self.booking(booking_id).await?;
        ctx.require_agent_access(booking.agent_id, "update bookings")?;

        let current = booking.booking_status;
        if !current.can_transition_to(status) {
            return Err(BookingError::InvalidTransition {
                from: current.label(),
                to: status.label(),
            });
        }

        match self
            .store
            .update_booking_status(booking_id, current, status)
            .await
        {
            Ok(updated) => {
                info!(
                    booking_id = %booking_id,
                    from = current.label(),
                    to = status.label(),
                    "booking status updated"
                );
                Ok(updated)
            }
            Err(RepositoryError::Conflict) => {
                let latest = self.booking(booking_id).await?;
                Err(BookingError::InvalidTransition {
                    from: latest.booking_status.label(),
                    to: status.label(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn booking(&self, id: BookingId) -> Result<Booking, BookingError> {
        self.store
            .fetch_booking(id)
            .await?
            .ok_or(BookingError::BookingNotFound(id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("departure {departure} must be after arrival {arrival}")]
    InvalidDateRange {
        arrival: NaiveDate,
        departure: NaiveDate,
    },
    #[error("room type {room_type_id} does not belong to hotel {hotel_id}")]
    InvalidRoomTypeForHotel {
        room_type_id: RoomTypeId,
        hotel_id: HotelId,
    },
    #[error("{points_per_night} points per night over {nights} nights is out of range")]
    RewardOutOfRange {
        points_per_night: Decimal,
        nights: u32,
    },
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),
    #[error("agent {0} is inactive")]
    AgentInactive(AgentId),
    #[error("hotel {0} not found")]
    HotelNotFound(HotelId),
    #[error("hotel {0} is inactive")]
    HotelInactive(HotelId),
    #[error("room type {0} not found")]
    RoomTypeNotFound(RoomTypeId),
    #[error("room type {0} is inactive")]
    RoomTypeInactive(RoomTypeId),
    #[error("booking {0} not found")]
    BookingNotFound(BookingId),
    #[error("cannot move booking from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
