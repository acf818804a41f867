//! PostgreSQL store. Uniqueness rules live in `schema.sql`; unique violations surface
//! as `RepositoryError::Conflict` and foreign-key violations as `NotFound`.

use std::collections::HashMap;
use std::fmt::Display;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::ids::{AgencyId, AgentId, ApplicationId, BookingId, HotelId, RedemptionId, RoomTypeId};
use crate::repository::RepositoryError;
use crate::workflows::bookings::{
    Booking, BookingRepository, BookingStatus, BookingView, VerificationStatus, VerificationUpdate,
};
use crate::workflows::catalog::{CatalogRepository, Hotel, HotelListing, RoomType};
use crate::workflows::onboarding::domain::ApplicationReview;
use crate::workflows::onboarding::{
    Agency, AgencyRepository, AgencySnapshot, Agent, AgentApplication, AgentRepository,
    ApplicationRepository, ApplicationStatus,
};
use crate::workflows::points::ledger::available_points;
use crate::workflows::points::{
    LedgerRepository, LedgerTotals, Redemption, RedemptionSettlement, RedemptionStatus,
    ReserveOutcome,
};

pub const SCHEMA: &str = include_str!("schema.sql");

const AGENCY_COLUMNS: &str =
    "id, name, address, city, country, zip_code, email, telephone, is_active, agent_id, reviewed_at, created_at";
const AGENT_COLUMNS: &str = "id, identity_id, first_name, last_name, email, telephone, agency_id, \
     agency_name, agency_city, agency_country, agency_zip_code, agency_email, agency_telephone, \
     is_active, booking_count, created_at";
const APPLICATION_COLUMNS: &str = "id, first_name, last_name, email, telephone, agency_id, status, \
     applied_at, reviewed_at, reviewed_by, notes";
const HOTEL_COLUMNS: &str =
    "id, name, address, city, country, zip_code, email, telephone, star_rating, is_active, created_at";
const ROOM_TYPE_COLUMNS: &str =
    "id, hotel_id, name, category, points_per_night, max_occupancy, base_price, is_active";
const BOOKING_COLUMNS: &str = "id, agent_id, hotel_id, room_type_id, guest_name, arrival_date, \
     departure_date, number_of_nights, points_per_night, reward_points, verification_status, \
     booking_status, confirmation_number, external_reference, verified_at, verified_by, \
     verification_notes, created_at";
const REDEMPTION_COLUMNS: &str = "id, agent_id, points_used, redemption_type, redemption_value, \
     status, created_at, processed_at, processed_by, notes";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(storage)?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates missing tables and indexes; safe to run on every start.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        info!("database schema ensured");
        Ok(())
    }

    async fn exists(&self, table: &'static str, id: Uuid) -> Result<bool, RepositoryError> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
        let (exists,): (bool,) = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(exists)
    }

    /// Conflict when the row exists but a guarded update matched nothing.
    async fn missed_update(&self, table: &'static str, id: Uuid) -> RepositoryError {
        match self.exists(table, id).await {
            Ok(true) => RepositoryError::Conflict,
            Ok(false) => RepositoryError::NotFound,
            Err(err) => err,
        }
    }
}

fn storage(err: sqlx::Error) -> RepositoryError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            return RepositoryError::Conflict;
        }
        if db.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    RepositoryError::Unavailable(err.to_string())
}

fn corrupt(what: &str, value: impl Display) -> RepositoryError {
    RepositoryError::Unavailable(format!("unexpected {what} '{value}' in store"))
}

async fn ledger_totals<'e, E>(executor: E, agent_id: AgentId) -> Result<LedgerTotals, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let (earned, completed, pending): (Decimal, Decimal, Decimal) = sqlx::query_as(
        "SELECT \
            COALESCE((SELECT SUM(reward_points) FROM bookings \
                      WHERE agent_id = $1 AND verification_status = 'approved'), 0), \
            COALESCE((SELECT SUM(points_used) FROM redemptions \
                      WHERE agent_id = $1 AND status = 'completed'), 0), \
            COALESCE((SELECT SUM(points_used) FROM redemptions \
                      WHERE agent_id = $1 AND status = 'pending'), 0)",
    )
    .bind(agent_id.0)
    .fetch_one(executor)
    .await
    .map_err(storage)?;

    Ok(LedgerTotals {
        earned,
        completed,
        pending,
    })
}

#[derive(FromRow)]
struct AgencyRow {
    id: Uuid,
    name: String,
    address: Option<String>,
    city: String,
    country: String,
    zip_code: String,
    email: Option<String>,
    telephone: Option<String>,
    is_active: bool,
    agent_id: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AgencyRow> for Agency {
    fn from(row: AgencyRow) -> Self {
        Self {
            id: AgencyId(row.id),
            name: row.name,
            address: row.address,
            city: row.city,
            country: row.country,
            zip_code: row.zip_code,
            email: row.email,
            telephone: row.telephone,
            is_active: row.is_active,
            agent_id: row.agent_id.map(AgentId),
            reviewed_at: row.reviewed_at,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct AgentRow {
    id: Uuid,
    identity_id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    telephone: Option<String>,
    agency_id: Option<Uuid>,
    agency_name: Option<String>,
    agency_city: Option<String>,
    agency_country: Option<String>,
    agency_zip_code: Option<String>,
    agency_email: Option<String>,
    agency_telephone: Option<String>,
    is_active: bool,
    booking_count: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<AgentRow> for Agent {
    type Error = RepositoryError;

    fn try_from(row: AgentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AgentId(row.id),
            identity_id: row.identity_id.into(),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            telephone: row.telephone,
            agency_id: row.agency_id.map(AgencyId),
            agency: AgencySnapshot {
                agency_name: row.agency_name,
                agency_city: row.agency_city,
                agency_country: row.agency_country,
                agency_zip_code: row.agency_zip_code,
                agency_email: row.agency_email,
                agency_telephone: row.agency_telephone,
            },
            is_active: row.is_active,
            booking_count: u32::try_from(row.booking_count)
                .map_err(|_| corrupt("booking count", row.booking_count))?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct ApplicationRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    email: String,
    telephone: Option<String>,
    agency_id: Uuid,
    status: String,
    applied_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<Uuid>,
    notes: Option<String>,
}

impl TryFrom<ApplicationRow> for AgentApplication {
    type Error = RepositoryError;

    fn try_from(row: ApplicationRow) -> Result<Self, Self::Error> {
        let status = ApplicationStatus::parse(&row.status)
            .ok_or_else(|| corrupt("application status", &row.status))?;
        Ok(Self {
            id: ApplicationId(row.id),
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            telephone: row.telephone,
            agency_id: AgencyId(row.agency_id),
            status,
            applied_at: row.applied_at,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
            notes: row.notes,
        })
    }
}

#[derive(FromRow)]
struct HotelRow {
    id: Uuid,
    name: String,
    address: String,
    city: String,
    country: String,
    zip_code: String,
    email: Option<String>,
    telephone: Option<String>,
    star_rating: i16,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<HotelRow> for Hotel {
    type Error = RepositoryError;

    fn try_from(row: HotelRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: HotelId(row.id),
            name: row.name,
            address: row.address,
            city: row.city,
            country: row.country,
            zip_code: row.zip_code,
            email: row.email,
            telephone: row.telephone,
            star_rating: u8::try_from(row.star_rating)
                .map_err(|_| corrupt("star rating", row.star_rating))?,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct RoomTypeRow {
    id: Uuid,
    hotel_id: Uuid,
    name: String,
    category: String,
    points_per_night: Decimal,
    max_occupancy: i32,
    base_price: Option<Decimal>,
    is_active: bool,
}

impl TryFrom<RoomTypeRow> for RoomType {
    type Error = RepositoryError;

    fn try_from(row: RoomTypeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RoomTypeId(row.id),
            hotel_id: HotelId(row.hotel_id),
            name: row.name,
            category: row.category,
            points_per_night: row.points_per_night,
            max_occupancy: u16::try_from(row.max_occupancy)
                .map_err(|_| corrupt("max occupancy", row.max_occupancy))?,
            base_price: row.base_price,
            is_active: row.is_active,
        })
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    agent_id: Uuid,
    hotel_id: Uuid,
    room_type_id: Uuid,
    guest_name: String,
    arrival_date: NaiveDate,
    departure_date: NaiveDate,
    number_of_nights: i32,
    points_per_night: Decimal,
    reward_points: Decimal,
    verification_status: String,
    booking_status: String,
    confirmation_number: String,
    external_reference: Option<String>,
    verified_at: Option<DateTime<Utc>>,
    verified_by: Option<Uuid>,
    verification_notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let verification_status = VerificationStatus::parse(&row.verification_status)
            .ok_or_else(|| corrupt("verification status", &row.verification_status))?;
        let booking_status = BookingStatus::parse(&row.booking_status)
            .ok_or_else(|| corrupt("booking status", &row.booking_status))?;
        Ok(Self {
            id: BookingId(row.id),
            agent_id: AgentId(row.agent_id),
            hotel_id: HotelId(row.hotel_id),
            room_type_id: RoomTypeId(row.room_type_id),
            guest_name: row.guest_name,
            arrival_date: row.arrival_date,
            departure_date: row.departure_date,
            number_of_nights: u32::try_from(row.number_of_nights)
                .map_err(|_| corrupt("number of nights", row.number_of_nights))?,
            points_per_night: row.points_per_night,
            reward_points: row.reward_points,
            verification_status,
            booking_status,
            confirmation_number: row.confirmation_number,
            external_reference: row.external_reference,
            verified_at: row.verified_at,
            verified_by: row.verified_by,
            verification_notes: row.verification_notes,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct BookingViewRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    hotel_name: String,
    hotel_city: String,
    hotel_country: String,
    room_type_name: String,
    room_type_category: String,
}

impl TryFrom<BookingViewRow> for BookingView {
    type Error = RepositoryError;

    fn try_from(row: BookingViewRow) -> Result<Self, Self::Error> {
        Ok(Self {
            booking: row.booking.try_into()?,
            hotel_name: row.hotel_name,
            hotel_city: row.hotel_city,
            hotel_country: row.hotel_country,
            room_type_name: row.room_type_name,
            room_type_category: row.room_type_category,
        })
    }
}

#[derive(FromRow)]
struct RedemptionRow {
    id: Uuid,
    agent_id: Uuid,
    points_used: Decimal,
    redemption_type: String,
    redemption_value: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    processed_by: Option<Uuid>,
    notes: Option<String>,
}

impl TryFrom<RedemptionRow> for Redemption {
    type Error = RepositoryError;

    fn try_from(row: RedemptionRow) -> Result<Self, Self::Error> {
        let status = RedemptionStatus::parse(&row.status)
            .ok_or_else(|| corrupt("redemption status", &row.status))?;
        Ok(Self {
            id: RedemptionId(row.id),
            agent_id: AgentId(row.agent_id),
            points_used: row.points_used,
            redemption_type: row.redemption_type,
            redemption_value: row.redemption_value,
            status,
            created_at: row.created_at,
            processed_at: row.processed_at,
            processed_by: row.processed_by,
            notes: row.notes,
        })
    }
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl AgencyRepository for PgStore {
    async fn search_agencies(&self, query: &str, limit: usize) -> Result<Vec<Agency>, RepositoryError> {
        let sql = format!(
            "SELECT {AGENCY_COLUMNS} FROM agencies \
             WHERE is_active AND (name ILIKE $1 OR city ILIKE $1 OR country ILIKE $1) \
             ORDER BY name, city LIMIT $2"
        );
        let rows: Vec<AgencyRow> = sqlx::query_as(&sql)
            .bind(like_pattern(query))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(Agency::from).collect())
    }

    async fn find_agency(
        &self,
        name: &str,
        city: &str,
        country: &str,
    ) -> Result<Option<Agency>, RepositoryError> {
        let sql = format!(
            "SELECT {AGENCY_COLUMNS} FROM agencies WHERE name = $1 AND city = $2 AND country = $3"
        );
        let row: Option<AgencyRow> = sqlx::query_as(&sql)
            .bind(name)
            .bind(city)
            .bind(country)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Agency::from))
    }

    async fn insert_agency_if_absent(&self, agency: Agency) -> Result<(Agency, bool), RepositoryError> {
        let sql = format!(
            "INSERT INTO agencies ({AGENCY_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             ON CONFLICT (name, city, country) DO NOTHING \
             RETURNING {AGENCY_COLUMNS}"
        );
        let inserted: Option<AgencyRow> = sqlx::query_as(&sql)
            .bind(agency.id.0)
            .bind(&agency.name)
            .bind(&agency.address)
            .bind(&agency.city)
            .bind(&agency.country)
            .bind(&agency.zip_code)
            .bind(&agency.email)
            .bind(&agency.telephone)
            .bind(agency.is_active)
            .bind(agency.agent_id.map(|id| id.0))
            .bind(agency.reviewed_at)
            .bind(agency.created_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }
        let existing = self
            .find_agency(&agency.name, &agency.city, &agency.country)
            .await?
            .ok_or(RepositoryError::Conflict)?;
        Ok((existing, false))
    }

    async fn fetch_agency(&self, id: AgencyId) -> Result<Option<Agency>, RepositoryError> {
        let sql = format!("SELECT {AGENCY_COLUMNS} FROM agencies WHERE id = $1");
        let row: Option<AgencyRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Agency::from))
    }

    async fn update_agency(&self, agency: Agency) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE agencies SET name = $2, address = $3, city = $4, country = $5, zip_code = $6, \
             email = $7, telephone = $8, is_active = $9, agent_id = $10, \
             reviewed_at = $11 WHERE id = $1",
        )
        .bind(agency.id.0)
        .bind(&agency.name)
        .bind(&agency.address)
        .bind(&agency.city)
        .bind(&agency.country)
        .bind(&agency.zip_code)
        .bind(&agency.email)
        .bind(&agency.telephone)
        .bind(agency.is_active)
        .bind(agency.agent_id.map(|id| id.0))
        .bind(agency.reviewed_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AgentRepository for PgStore {
    async fn insert_agent(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        let sql = format!(
            "INSERT INTO agents ({AGENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"
        );
        sqlx::query(&sql)
            .bind(agent.id.0)
            .bind(agent.identity_id.0)
            .bind(&agent.first_name)
            .bind(&agent.last_name)
            .bind(&agent.email)
            .bind(&agent.telephone)
            .bind(agent.agency_id.map(|id| id.0))
            .bind(&agent.agency.agency_name)
            .bind(&agent.agency.agency_city)
            .bind(&agent.agency.agency_country)
            .bind(&agent.agency.agency_zip_code)
            .bind(&agent.agency.agency_email)
            .bind(&agent.agency.agency_telephone)
            .bind(agent.is_active)
            .bind(i32::try_from(agent.booking_count).unwrap_or(i32::MAX))
            .bind(agent.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(agent)
    }

    async fn fetch_agent(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents WHERE id = $1");
        let row: Option<AgentRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Agent::try_from).transpose()
    }

    async fn find_agent_by_email(&self, email: &str) -> Result<Option<Agent>, RepositoryError> {
        let sql = format!("SELECT {AGENT_COLUMNS} FROM agents WHERE email = $1");
        let row: Option<AgentRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Agent::try_from).transpose()
    }

    /// The booking counter is owned by `insert_booking` and left untouched here.
    async fn update_agent(&self, agent: Agent) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE agents SET first_name = $2, last_name = $3, email = $4, telephone = $5, \
             agency_id = $6, agency_name = $7, agency_city = $8, agency_country = $9, \
             agency_zip_code = $10, agency_email = $11, agency_telephone = $12, is_active = $13 \
             WHERE id = $1",
        )
        .bind(agent.id.0)
        .bind(&agent.first_name)
        .bind(&agent.last_name)
        .bind(&agent.email)
        .bind(&agent.telephone)
        .bind(agent.agency_id.map(|id| id.0))
        .bind(&agent.agency.agency_name)
        .bind(&agent.agency.agency_city)
        .bind(&agent.agency.agency_country)
        .bind(&agent.agency.agency_zip_code)
        .bind(&agent.agency.agency_email)
        .bind(&agent.agency.agency_telephone)
        .bind(agent.is_active)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ApplicationRepository for PgStore {
    async fn insert_application(
        &self,
        application: AgentApplication,
    ) -> Result<AgentApplication, RepositoryError> {
        let sql = format!(
            "INSERT INTO agent_applications ({APPLICATION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(application.id.0)
            .bind(&application.first_name)
            .bind(&application.last_name)
            .bind(&application.email)
            .bind(&application.telephone)
            .bind(application.agency_id.0)
            .bind(application.status.label())
            .bind(application.applied_at)
            .bind(application.reviewed_at)
            .bind(application.reviewed_by)
            .bind(&application.notes)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(application)
    }

    async fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<AgentApplication>, RepositoryError> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM agent_applications WHERE id = $1");
        let row: Option<ApplicationRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(AgentApplication::try_from).transpose()
    }

    async fn find_open_application(
        &self,
        email: &str,
    ) -> Result<Option<AgentApplication>, RepositoryError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM agent_applications \
             WHERE email = $1 AND status = 'pending'"
        );
        let row: Option<ApplicationRow> = sqlx::query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(AgentApplication::try_from).transpose()
    }

    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        limit: usize,
    ) -> Result<Vec<AgentApplication>, RepositoryError> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS} FROM agent_applications \
             WHERE ($1::TEXT IS NULL OR status = $1) \
             ORDER BY applied_at DESC LIMIT $2"
        );
        let rows: Vec<ApplicationRow> = sqlx::query_as(&sql)
            .bind(status.map(ApplicationStatus::label))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.into_iter().map(AgentApplication::try_from).collect()
    }

    async fn review_application(
        &self,
        id: ApplicationId,
        review: ApplicationReview,
    ) -> Result<AgentApplication, RepositoryError> {
        let sql = format!(
            "UPDATE agent_applications \
             SET status = $2, reviewed_at = $3, reviewed_by = $4, notes = $5 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {APPLICATION_COLUMNS}"
        );
        let row: Option<ApplicationRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(review.status.label())
            .bind(review.reviewed_at)
            .bind(review.reviewed_by)
            .bind(&review.notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.missed_update("agent_applications", id.0).await),
        }
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn insert_hotel(&self, hotel: Hotel) -> Result<Hotel, RepositoryError> {
        let sql = format!(
            "INSERT INTO hotels ({HOTEL_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&sql)
            .bind(hotel.id.0)
            .bind(&hotel.name)
            .bind(&hotel.address)
            .bind(&hotel.city)
            .bind(&hotel.country)
            .bind(&hotel.zip_code)
            .bind(&hotel.email)
            .bind(&hotel.telephone)
            .bind(i16::from(hotel.star_rating))
            .bind(hotel.is_active)
            .bind(hotel.created_at)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(hotel)
    }

    async fn insert_room_type(&self, room_type: RoomType) -> Result<RoomType, RepositoryError> {
        let sql = format!(
            "INSERT INTO room_types ({ROOM_TYPE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&sql)
            .bind(room_type.id.0)
            .bind(room_type.hotel_id.0)
            .bind(&room_type.name)
            .bind(&room_type.category)
            .bind(room_type.points_per_night)
            .bind(i32::from(room_type.max_occupancy))
            .bind(room_type.base_price)
            .bind(room_type.is_active)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(room_type)
    }

    async fn fetch_hotel(&self, id: HotelId) -> Result<Option<Hotel>, RepositoryError> {
        let sql = format!("SELECT {HOTEL_COLUMNS} FROM hotels WHERE id = $1");
        let row: Option<HotelRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Hotel::try_from).transpose()
    }

    async fn fetch_room_type(&self, id: RoomTypeId) -> Result<Option<RoomType>, RepositoryError> {
        let sql = format!("SELECT {ROOM_TYPE_COLUMNS} FROM room_types WHERE id = $1");
        let row: Option<RoomTypeRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(RoomType::try_from).transpose()
    }

    async fn list_hotels(&self, active_only: bool) -> Result<Vec<HotelListing>, RepositoryError> {
        let hotels_sql = format!(
            "SELECT {HOTEL_COLUMNS} FROM hotels WHERE (NOT $1 OR is_active) ORDER BY name"
        );
        let hotels: Vec<HotelRow> = sqlx::query_as(&hotels_sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let rooms_sql = format!(
            "SELECT {ROOM_TYPE_COLUMNS} FROM room_types WHERE (NOT $1 OR is_active) ORDER BY name"
        );
        let rooms: Vec<RoomTypeRow> = sqlx::query_as(&rooms_sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;

        let mut by_hotel: HashMap<HotelId, Vec<RoomType>> = HashMap::new();
        for row in rooms {
            let room = RoomType::try_from(row)?;
            by_hotel.entry(room.hotel_id).or_default().push(room);
        }

        hotels
            .into_iter()
            .map(|row| {
                let hotel = Hotel::try_from(row)?;
                let room_types = by_hotel.remove(&hotel.id).unwrap_or_default();
                Ok(HotelListing { hotel, room_types })
            })
            .collect()
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let bumped = sqlx::query("UPDATE agents SET booking_count = booking_count + 1 WHERE id = $1")
            .bind(booking.agent_id.0)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        if bumped.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let sql = format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)"
        );
        sqlx::query(&sql)
            .bind(booking.id.0)
            .bind(booking.agent_id.0)
            .bind(booking.hotel_id.0)
            .bind(booking.room_type_id.0)
            .bind(&booking.guest_name)
            .bind(booking.arrival_date)
            .bind(booking.departure_date)
            .bind(i32::try_from(booking.number_of_nights).map_err(|_| {
                RepositoryError::Unavailable("stay too long to store".to_string())
            })?)
            .bind(booking.points_per_night)
            .bind(booking.reward_points)
            .bind(booking.verification_status.label())
            .bind(booking.booking_status.label())
            .bind(&booking.confirmation_number)
            .bind(&booking.external_reference)
            .bind(booking.verified_at)
            .bind(booking.verified_by)
            .bind(&booking.verification_notes)
            .bind(booking.created_at)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(booking)
    }

    async fn fetch_booking(&self, id: BookingId) -> Result<Option<Booking>, RepositoryError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_agent_bookings(&self, agent_id: AgentId) -> Result<Vec<BookingView>, RepositoryError> {
        let rows: Vec<BookingViewRow> = sqlx::query_as(
            "SELECT b.id, b.agent_id, b.hotel_id, b.room_type_id, b.guest_name, b.arrival_date, \
                    b.departure_date, b.number_of_nights, b.points_per_night, b.reward_points, \
                    b.verification_status, b.booking_status, b.confirmation_number, \
                    b.external_reference, b.verified_at, b.verified_by, b.verification_notes, \
                    b.created_at, \
                    h.name AS hotel_name, h.city AS hotel_city, h.country AS hotel_country, \
                    r.name AS room_type_name, r.category AS room_type_category \
             FROM bookings b \
             JOIN hotels h ON h.id = b.hotel_id \
             JOIN room_types r ON r.id = b.room_type_id \
             WHERE b.agent_id = $1 \
             ORDER BY b.created_at DESC",
        )
        .bind(agent_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.into_iter().map(BookingView::try_from).collect()
    }

    async fn update_verification(
        &self,
        id: BookingId,
        expected: VerificationStatus,
        update: VerificationUpdate,
    ) -> Result<Booking, RepositoryError> {
        let sql = format!(
            "UPDATE bookings \
             SET verification_status = $3, verified_at = $4, verified_by = $5, verification_notes = $6 \
             WHERE id = $1 AND verification_status = $2 \
             RETURNING {BOOKING_COLUMNS}"
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(expected.label())
            .bind(update.status.label())
            .bind(update.verified_at)
            .bind(update.verified_by)
            .bind(&update.notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.missed_update("bookings", id.0).await),
        }
    }

    async fn update_booking_status(
        &self,
        id: BookingId,
        expected: BookingStatus,
        next: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        let sql = format!(
            "UPDATE bookings SET booking_status = $3 \
             WHERE id = $1 AND booking_status = $2 \
             RETURNING {BOOKING_COLUMNS}"
        );
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(expected.label())
            .bind(next.label())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.missed_update("bookings", id.0).await),
        }
    }
}

#[async_trait]
impl LedgerRepository for PgStore {
    async fn ledger_totals(&self, agent_id: AgentId) -> Result<LedgerTotals, RepositoryError> {
        ledger_totals(&self.pool, agent_id).await
    }

    /// The agent row lock serialises concurrent reservations for the same agent.
    async fn reserve_redemption(&self, redemption: Redemption) -> Result<ReserveOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM agents WHERE id = $1 FOR UPDATE")
            .bind(redemption.agent_id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let totals = ledger_totals(&mut *tx, redemption.agent_id).await?;
        let available = available_points(&totals);
        if redemption.points_used > available {
            tx.rollback().await.map_err(storage)?;
            return Ok(ReserveOutcome::Insufficient { available });
        }

        let sql = format!(
            "INSERT INTO redemptions ({REDEMPTION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        sqlx::query(&sql)
            .bind(redemption.id.0)
            .bind(redemption.agent_id.0)
            .bind(redemption.points_used)
            .bind(&redemption.redemption_type)
            .bind(redemption.redemption_value)
            .bind(redemption.status.label())
            .bind(redemption.created_at)
            .bind(redemption.processed_at)
            .bind(redemption.processed_by)
            .bind(&redemption.notes)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        tx.commit().await.map_err(storage)?;
        Ok(ReserveOutcome::Reserved(redemption))
    }

    async fn fetch_redemption(&self, id: RedemptionId) -> Result<Option<Redemption>, RepositoryError> {
        let sql = format!("SELECT {REDEMPTION_COLUMNS} FROM redemptions WHERE id = $1");
        let row: Option<RedemptionRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Redemption::try_from).transpose()
    }

    async fn list_redemptions(&self, agent_id: AgentId) -> Result<Vec<Redemption>, RepositoryError> {
        let sql = format!(
            "SELECT {REDEMPTION_COLUMNS} FROM redemptions WHERE agent_id = $1 ORDER BY created_at DESC"
        );
        let rows: Vec<RedemptionRow> = sqlx::query_as(&sql)
            .bind(agent_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.into_iter().map(Redemption::try_from).collect()
    }

    async fn settle_redemption(
        &self,
        id: RedemptionId,
        settlement: RedemptionSettlement,
    ) -> Result<Redemption, RepositoryError> {
        let sql = format!(
            "UPDATE redemptions SET status = $2, processed_at = $3, processed_by = $4, notes = $5 \
             WHERE id = $1 AND status = 'pending' \
             RETURNING {REDEMPTION_COLUMNS}"
        );
        let row: Option<RedemptionRow> = sqlx::query_as(&sql)
            .bind(id.0)
            .bind(settlement.status.label())
            .bind(settlement.processed_at)
            .bind(settlement.processed_by)
            .bind(&settlement.notes)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self.missed_update("redemptions", id.0).await),
        }
    }
}
