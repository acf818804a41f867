use std::error::Error;
use std::sync::Arc;

use agent_rewards::auth::AuthContext;
use agent_rewards::error::AppError;
use agent_rewards::store::{MemoryIdentityProvider, MemoryOutbox, MemoryStore};
use agent_rewards::workflows::bookings::{BookingRequest, BookingService, VerificationStatus};
use agent_rewards::workflows::catalog::{CatalogService, HotelRegistration, RoomTypeRegistration};
use agent_rewards::workflows::onboarding::{
    AgencyDetails, ApplicantDetails, ApplicationResult, ApplicationSubmission, NotificationStatus,
    OnboardingService,
};
use agent_rewards::workflows::points::{
    PointsBalance, PointsService, RedemptionPolicy, RedemptionRequest,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Points earned per night for the demo room type
    #[arg(long, default_value = "5", value_parser = crate::infra::parse_points)]
    pub(crate) points_per_night: Decimal,
    /// Length of the demo stay in nights
    #[arg(long, default_value_t = 3)]
    pub(crate) nights: u32,
    /// Arrival date (YYYY-MM-DD). Defaults to 30 days from today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) arrival: Option<NaiveDate>,
    /// Points to redeem once the booking is verified
    #[arg(long, default_value = "10", value_parser = crate::infra::parse_points)]
    pub(crate) redeem: Decimal,
    /// Voucher code to redeem against instead of cash
    #[arg(long)]
    pub(crate) voucher: Option<String>,
}

type MemoryOnboarding = OnboardingService<MemoryStore, MemoryIdentityProvider, MemoryOutbox>;

struct DemoServices {
    onboarding: MemoryOnboarding,
    catalog: CatalogService<MemoryStore>,
    bookings: BookingService<MemoryStore>,
    points: PointsService<MemoryStore>,
    outbox: Arc<MemoryOutbox>,
}

impl DemoServices {
    fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::default());
        let outbox = Arc::new(MemoryOutbox::default());
        Self {
            onboarding: OnboardingService::new(
                store.clone(),
                Arc::new(MemoryIdentityProvider::default()),
                outbox.clone(),
            ),
            catalog: CatalogService::new(store.clone()),
            bookings: BookingService::new(store.clone()),
            points: PointsService::new(store, RedemptionPolicy::default()),
            outbox,
        }
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Agent rewards walkthrough (in-memory store)");
    if let Err(err) = walkthrough(args).await {
        println!("  Walkthrough stopped: {err}");
    }
    Ok(())
}

async fn walkthrough(args: DemoArgs) -> Result<(), Box<dyn Error>> {
    let DemoArgs {
        points_per_night,
        nights,
        arrival,
        redeem,
        voucher,
    } = args;
    let services = DemoServices::in_memory();
    let admin = AuthContext::admin(Uuid::new_v4());

    println!("\nOnboarding");
    let submission = ApplicationSubmission {
        applicant: ApplicantDetails {
            first_name: "Mele".to_string(),
            last_name: "Taufa".to_string(),
            email: "mele@reeftravel.example".to_string(),
            telephone: None,
        },
        agency_id: None,
        agency: Some(AgencyDetails {
            name: "Reef Travel".to_string(),
            city: "Apia".to_string(),
            country: "Samoa".to_string(),
            zip_code: "WS-1".to_string(),
            ..AgencyDetails::default()
        }),
    };
    let application = match services.onboarding.submit_application(submission).await? {
        ApplicationResult::Submitted {
            application,
            agency_created,
            ..
        } => {
            println!(
                "- Application {} received (new agency: {agency_created})",
                application.id
            );
            application
        }
        other => {
            println!("- Application not accepted: {other:?}");
            return Ok(());
        }
    };

    let approval = services
        .onboarding
        .approve_application(&admin, application.id, Some("demo approval".to_string()))
        .await?;
    let agent = approval.agent;
    println!(
        "- Approved {} as agent {} ({})",
        agent.full_name(),
        agent.id,
        agent.agency.agency_name.as_deref().unwrap_or("no agency")
    );
    match approval.notification {
        NotificationStatus::Sent => println!(
            "  Welcome message queued ({} in outbox)",
            services.outbox.messages().len()
        ),
        NotificationStatus::Failed { reason } => println!("  Welcome message failed: {reason}"),
    }

    println!("\nCatalog");
    let hotel = services
        .catalog
        .register_hotel(
            &admin,
            HotelRegistration {
                name: "Lalomanu Beach Fales".to_string(),
                city: "Lalomanu".to_string(),
                country: "Samoa".to_string(),
                star_rating: 3,
                ..HotelRegistration::default()
            },
        )
        .await?;
    let room = services
        .catalog
        .add_room_type(
            &admin,
            hotel.id,
            RoomTypeRegistration {
                name: "Beachfront Fale".to_string(),
                category: "fale".to_string(),
                points_per_night,
                max_occupancy: 2,
                base_price: None,
            },
        )
        .await?;
    println!(
        "- {} / {} earns {} points per night",
        hotel.name, room.name, room.points_per_night
    );

    println!("\nBooking");
    let agent_ctx = AuthContext::agent(Uuid::new_v4(), agent.id);
    let arrival = arrival.unwrap_or_else(|| Local::now().date_naive() + Duration::days(30));
    let departure = arrival + Duration::days(i64::from(nights));
    let booking = services
        .bookings
        .create_booking(
            &agent_ctx,
            BookingRequest {
                agent_id: Some(agent.id),
                hotel_id: Some(hotel.id),
                room_type_id: Some(room.id),
                arrival_date: Some(arrival),
                departure_date: Some(departure),
                guest_name: Some("Demo Guest".to_string()),
                external_reference: None,
            },
        )
        .await?;
    println!(
        "- {} | {} nights from {} | {} points pending verification",
        booking.booking.confirmation_number,
        booking.booking.number_of_nights,
        booking.booking.arrival_date,
        booking.booking.reward_points
    );
    print_balance(
        "  Before verification",
        &services.points.balance(&agent_ctx, agent.id).await?,
    );

    services
        .bookings
        .verify_booking(
            &admin,
            booking.booking.id,
            VerificationStatus::Approved,
            None,
        )
        .await?;
    print_balance(
        "  After verification",
        &services.points.balance(&agent_ctx, agent.id).await?,
    );

    println!("\nRedemption");
    let redemption = services
        .points
        .redeem(
            &agent_ctx,
            agent.id,
            RedemptionRequest {
                points: redeem,
                voucher_code: voucher,
            },
        )
        .await?;
    println!(
        "- Reserved {} points as {} worth {}",
        redemption.points_used, redemption.redemption_type, redemption.redemption_value
    );
    print_balance(
        "  While pending",
        &services.points.balance(&agent_ctx, agent.id).await?,
    );

    services
        .points
        .complete_redemption(&admin, redemption.id, Some("paid".to_string()))
        .await?;
    print_balance(
        "  After completion",
        &services.points.balance(&agent_ctx, agent.id).await?,
    );

    Ok(())
}

fn print_balance(label: &str, balance: &PointsBalance) {
    println!(
        "{label}: earned {} | redeemed {} | pending {} | available {} | can redeem: {} | next threshold {}",
        balance.total_earned,
        balance.total_redeemed,
        balance.pending_redemptions,
        balance.available_points,
        balance.can_redeem,
        balance.next_threshold
    );
}
