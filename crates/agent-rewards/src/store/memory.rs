use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::ids::{AgencyId, AgentId, ApplicationId, BookingId, HotelId, RedemptionId, RoomTypeId};
use crate::repository::RepositoryError;
use crate::workflows::bookings::{
    Booking, BookingRepository, BookingStatus, BookingView, VerificationStatus, VerificationUpdate,
};
use crate::workflows::catalog::{CatalogRepository, Hotel, HotelListing, RoomType};
use crate::workflows::onboarding::domain::ApplicationReview;
use crate::workflows::onboarding::{
    Agency, AgencyRepository, Agent, AgentApplication, AgentRepository, ApplicationRepository,
    ApplicationStatus,
};
use crate::workflows::points::ledger::available_points;
use crate::workflows::points::{
    LedgerRepository, LedgerTotals, Redemption, RedemptionSettlement, RedemptionStatus,
    ReserveOutcome,
};

#[derive(Debug, Default)]
struct Tables {
    agencies: HashMap<AgencyId, Agency>,
    agents: HashMap<AgentId, Agent>,
    applications: HashMap<ApplicationId, AgentApplication>,
    hotels: HashMap<HotelId, Hotel>,
    room_types: HashMap<RoomTypeId, RoomType>,
    bookings: HashMap<BookingId, Booking>,
    redemptions: HashMap<RedemptionId, Redemption>,
}

impl Tables {
    fn ledger_totals(&self, agent_id: AgentId) -> Result<LedgerTotals, RepositoryError> {
        let mut totals = LedgerTotals::default();
        for booking in self.bookings.values().filter(|booking| {
            booking.agent_id == agent_id && booking.verification_status == VerificationStatus::Approved
        }) {
            totals.earned = checked_total(totals.earned, booking.reward_points)?;
        }
        for redemption in self.redemptions.values().filter(|r| r.agent_id == agent_id) {
            match redemption.status {
                RedemptionStatus::Completed => {
                    totals.completed = checked_total(totals.completed, redemption.points_used)?;
                }
                RedemptionStatus::Pending => {
                    totals.pending = checked_total(totals.pending, redemption.points_used)?;
                }
                RedemptionStatus::Rejected => {}
            }
        }
        Ok(totals)
    }

    fn booking_view(&self, booking: &Booking) -> Option<BookingView> {
        let hotel = self.hotels.get(&booking.hotel_id)?;
        let room_type = self.room_types.get(&booking.room_type_id)?;
        Some(BookingView {
            booking: booking.clone(),
            hotel_name: hotel.name.clone(),
            hotel_city: hotel.city.clone(),
            hotel_country: hotel.country.clone(),
            room_type_name: room_type.name.clone(),
            room_type_category: room_type.category.clone(),
        })
    }
}

fn checked_total(total: Decimal, points: Decimal) -> Result<Decimal, RepositoryError> {
    total
        .checked_add(points)
        .ok_or_else(|| RepositoryError::Unavailable("points total out of range".to_string()))
}

/// Process-local store. Every table sits behind one mutex, so each trait call is
/// atomic and the uniqueness rules of the SQL schema hold here too.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AgencyRepository for MemoryStore {
    async fn search_agencies(&self, query: &str, limit: usize) -> Result<Vec<Agency>, RepositoryError> {
        let needle = query.to_lowercase();
        let tables = self.lock()?;
        let mut hits: Vec<Agency> = tables
            .agencies
            .values()
            .filter(|agency| agency.is_active)
            .filter(|agency| {
                [&agency.name, &agency.city, &agency.country]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.city.cmp(&b.city)));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn find_agency(
        &self,
        name: &str,
        city: &str,
        country: &str,
    ) -> Result<Option<Agency>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .agencies
            .values()
            .find(|agency| agency.matches(name, city, country))
            .cloned())
    }

    async fn insert_agency_if_absent(&self, agency: Agency) -> Result<(Agency, bool), RepositoryError> {
        let mut tables = self.lock()?;
        if let Some(existing) = tables
            .agencies
            .values()
            .find(|existing| existing.matches(&agency.name, &agency.city, &agency.country))
        {
            return Ok((existing.clone(), false));
        }
        tables.agencies.insert(agency.id, agency.clone());
        Ok((agency, true))
    }

    async fn fetch_agency(&self, id: AgencyId) -> Result<Option<Agency>, RepositoryError> {
        Ok(self.lock()?.agencies.get(&id).cloned())
    }

    async fn update_agency(&self, agency: Agency) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.agencies.get_mut(&agency.id) {
            Some(slot) => {
                *slot = agency;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[async_trait]
impl AgentRepository for MemoryStore {
    async fn insert_agent(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        let mut tables = self.lock()?;
        if tables
            .agents
            .values()
            .any(|existing| existing.id == agent.id || existing.email == agent.email)
        {
            return Err(RepositoryError::Conflict);
        }
        tables.agents.insert(agent.id, agent.clone());
        Ok(agent)
    }

    async fn fetch_agent(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        Ok(self.lock()?.agents.get(&id).cloned())
    }

    async fn find_agent_by_email(&self, email: &str) -> Result<Option<Agent>, RepositoryError> {
        Ok(self
            .lock()?
            .agents
            .values()
            .find(|agent| agent.email == email)
            .cloned())
    }

    async fn update_agent(&self, agent: Agent) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.agents.get_mut(&agent.id) {
            Some(slot) => {
                *slot = agent;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[async_trait]
impl ApplicationRepository for MemoryStore {
    async fn insert_application(
        &self,
        application: AgentApplication,
    ) -> Result<AgentApplication, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.agencies.contains_key(&application.agency_id) {
            return Err(RepositoryError::NotFound);
        }
        let open_duplicate = tables.applications.values().any(|existing| {
            existing.status == ApplicationStatus::Pending && existing.email == application.email
        });
        if open_duplicate || tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.applications.insert(application.id, application.clone());
        Ok(application)
    }

    async fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<AgentApplication>, RepositoryError> {
        Ok(self.lock()?.applications.get(&id).cloned())
    }

    async fn find_open_application(
        &self,
        email: &str,
    ) -> Result<Option<AgentApplication>, RepositoryError> {
        Ok(self
            .lock()?
            .applications
            .values()
            .find(|application| {
                application.status == ApplicationStatus::Pending && application.email == email
            })
            .cloned())
    }

    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        limit: usize,
    ) -> Result<Vec<AgentApplication>, RepositoryError> {
        let tables = self.lock()?;
        let mut applications: Vec<AgentApplication> = tables
            .applications
            .values()
            .filter(|application| status.map_or(true, |status| application.status == status))
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        applications.truncate(limit);
        Ok(applications)
    }

    async fn review_application(
        &self,
        id: ApplicationId,
        review: ApplicationReview,
    ) -> Result<AgentApplication, RepositoryError> {
        let mut tables = self.lock()?;
        let application = tables
            .applications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if application.status != ApplicationStatus::Pending {
            return Err(RepositoryError::Conflict);
        }
        application.status = review.status;
        application.reviewed_at = Some(review.reviewed_at);
        application.reviewed_by = Some(review.reviewed_by);
        application.notes = review.notes;
        Ok(application.clone())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn insert_hotel(&self, hotel: Hotel) -> Result<Hotel, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.hotels.contains_key(&hotel.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.hotels.insert(hotel.id, hotel.clone());
        Ok(hotel)
    }

    async fn insert_room_type(&self, room_type: RoomType) -> Result<RoomType, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.hotels.contains_key(&room_type.hotel_id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.room_types.contains_key(&room_type.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.room_types.insert(room_type.id, room_type.clone());
        Ok(room_type)
    }

    async fn fetch_hotel(&self, id: HotelId) -> Result<Option<Hotel>, RepositoryError> {
        Ok(self.lock()?.hotels.get(&id).cloned())
    }

    async fn fetch_room_type(&self, id: RoomTypeId) -> Result<Option<RoomType>, RepositoryError> {
        Ok(self.lock()?.room_types.get(&id).cloned())
    }

    async fn list_hotels(&self, active_only: bool) -> Result<Vec<HotelListing>, RepositoryError> {
        let tables = self.lock()?;
        let mut listings: Vec<HotelListing> = tables
            .hotels
            .values()
            .filter(|hotel| !active_only || hotel.is_active)
            .map(|hotel| {
                let mut room_types: Vec<RoomType> = tables
                    .room_types
                    .values()
                    .filter(|room| room.hotel_id == hotel.id && (!active_only || room.is_active))
                    .cloned()
                    .collect();
                room_types.sort_by(|a, b| a.name.cmp(&b.name));
                HotelListing {
                    hotel: hotel.clone(),
                    room_types,
                }
            })
            .collect();
        listings.sort_by(|a, b| a.hotel.name.cmp(&b.hotel.name));
        Ok(listings)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.bookings.values().any(|existing| {
            existing.id == booking.id || existing.confirmation_number == booking.confirmation_number
        }) {
            return Err(RepositoryError::Conflict);
        }
        match tables.agents.get_mut(&booking.agent_id) {
            Some(agent) => agent.booking_count = agent.booking_count.saturating_add(1),
            None => return Err(RepositoryError::NotFound),
        }
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn fetch_booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    async fn list_agent_bookings(&self, agent_id: AgentId) -> Result<Vec<BookingView>, RepositoryError> {
        let tables = self.lock()?;
        let mut views: Vec<BookingView> = tables
            .bookings
            .values()
            .filter(|booking| booking.agent_id == agent_id)
            .filter_map(|booking| tables.booking_view(booking))
            .collect();
        views.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
        Ok(views)
    }

    async fn update_verification(
        &self,
        id: BookingId,
        expected: VerificationStatus,
        update: VerificationUpdate,
    ) -> Result<Booking, RepositoryError> {
        let mut tables = self.lock()?;
        let booking = tables.bookings.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if booking.verification_status != expected {
            return Err(RepositoryError::Conflict);
        }
        booking.verification_status = update.status;
        booking.verified_at = Some(update.verified_at);
        booking.verified_by = Some(update.verified_by);
        booking.verification_notes = update.notes;
        Ok(booking.clone())
    }

    async fn update_booking_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let mut tables = self.lock()?;
        let booking = tables.bookings.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if booking.booking_status != expected {
            return Err(RepositoryError::Conflict);
        }
        booking.booking_status = next;
        Ok(booking.clone())
    }
}

#[async_trait]
impl LedgerRepository for MemoryStore {
    async fn ledger_totals(&self, agent_id: AgentId) -> Result<LedgerTotals, RepositoryError> {
        self.lock()?.ledger_totals(agent_id)
    }

    async fn reserve_redemption(&self, redemption: Redemption) -> Result<ReserveOutcome, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.agents.contains_key(&redemption.agent_id) {
            return Err(RepositoryError::NotFound);
        }
        let available = available_points(&tables.ledger_totals(redemption.agent_id)?);
        if redemption.points_used > available {
            return Ok(ReserveOutcome::Insufficient { available });
        }
        tables.redemptions.insert(redemption.id, redemption.clone());
        Ok(ReserveOutcome::Reserved(redemption))
    }

    async fn fetch_redemption(&self, id: RedemptionId) -> Result<Option<Redemption>, RepositoryError> {
        Ok(self.lock()?.redemptions.get(&id).cloned())
    }

    async fn list_redemptions(&self, agent_id: AgentId) -> Result<Vec<Redemption>, RepositoryError> {
        let tables = self.lock()?;
        let mut redemptions: Vec<Redemption> = tables
            .redemptions
            .values()
            .filter(|redemption| redemption.agent_id == agent_id)
            .cloned()
            .collect();
        redemptions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(redemptions)
    }

    async fn settle_redemption(
        &self,
        id: RedemptionId,
        settlement: RedemptionSettlement,
    ) -> Result<Redemption, RepositoryError> {
        let mut tables = self.lock()?;
        let redemption = tables
            .redemptions
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if redemption.status != RedemptionStatus::Pending {
            return Err(RepositoryError::Conflict);
        }
        redemption.status = settlement.status;
        redemption.processed_at = Some(settlement.processed_at);
        redemption.processed_by = Some(settlement.processed_by);
        redemption.notes = settlement.notes;
        Ok(redemption.clone())
    }
}
