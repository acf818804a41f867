use async_trait::async_trait;

use super::domain::{Booking, BookingStatus, BookingView, VerificationStatus, VerificationUpdate};
use crate::ids::{AgentId, BookingId};
use crate::repository::RepositoryError;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Stores the booking and bumps the agent's booking counter in one step.
    /// `Conflict` on a reused confirmation number, `NotFound` for an unknown agent.
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError>;
    async fn fetch_booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError>;
    /// Newest first, joined with hotel and room type display fields.
    async fn list_agent_bookings(&self, agent_id: AgentId) -> Result<Vec<BookingView>, RepositoryError>;
    /// `Conflict` unless the stored status still equals `expected`.
    async fn update_verification(
        &self,
        id: BookingId,
        expected: VerificationStatus,
        update: VerificationUpdate,
    ) -> Result<Booking, RepositoryError>;
    /// `Conflict` unless the stored status still equals `expected`.
    async fn update_booking_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking, RepositoryError>;
}
