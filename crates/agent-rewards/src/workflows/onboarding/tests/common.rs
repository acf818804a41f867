use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{ActorRole, AuthContext};
use crate::ids::{AgencyId, AgentId, ApplicationId, IdentityId};
use crate::repository::RepositoryError;
use crate::store::{MemoryIdentityProvider, MemoryOutbox, MemoryStore};
use crate::workflows::onboarding::domain::ApplicationReview;
use crate::workflows::onboarding::{
    Agency, AgencyDetails, AgencyRepository, Agent, AgentApplication, AgentRepository,
    ApplicantDetails, ApplicationRepository, ApplicationResult, ApplicationStatus,
    ApplicationSubmission, IdentityError, IdentityProvider, NewIdentity, NotificationError,
    NotificationSender, OnboardingService, WelcomeMessage,
};

pub(super) type MemoryOnboarding = OnboardingService<MemoryStore, MemoryIdentityProvider, MemoryOutbox>;

pub(super) struct Harness {
    pub(super) service: Arc<MemoryOnboarding>,
    pub(super) store: Arc<MemoryStore>,
    pub(super) identities: Arc<MemoryIdentityProvider>,
    pub(super) outbox: Arc<MemoryOutbox>,
}

pub(super) fn harness() -> Harness {
    let store = Arc::new(MemoryStore::default());
    let identities = Arc::new(MemoryIdentityProvider::default());
    let outbox = Arc::new(MemoryOutbox::default());
    let service = Arc::new(OnboardingService::new(
        store.clone(),
        identities.clone(),
        outbox.clone(),
    ));
    Harness {
        service,
        store,
        identities,
        outbox,
    }
}

pub(super) fn admin() -> AuthContext {
    AuthContext::admin(Uuid::new_v4())
}

pub(super) fn resort_manager() -> AuthContext {
    AuthContext::with_role(Uuid::new_v4(), ActorRole::ResortManager)
}

pub(super) fn agency_details() -> AgencyDetails {
    AgencyDetails {
        name: "Coral Coast Journeys".to_string(),
        city: "Nadi".to_string(),
        country: "Fiji".to_string(),
        zip_code: "FJ-200".to_string(),
        address: Some("12 Queens Road".to_string()),
        email: Some("bookings@coralcoast.example".to_string()),
        telephone: None,
    }
}

pub(super) fn submission(email: &str) -> ApplicationSubmission {
    ApplicationSubmission {
        applicant: ApplicantDetails {
            first_name: "Litia".to_string(),
            last_name: "Naivalu".to_string(),
            email: email.to_string(),
            telephone: Some("+679 555 0100".to_string()),
        },
        agency_id: None,
        agency: Some(agency_details()),
    }
}

pub(super) async fn submitted(service: &MemoryOnboarding, email: &str) -> AgentApplication {
    match service
        .submit_application(submission(email))
        .await
        .expect("submission succeeds")
    {
        ApplicationResult::Submitted { application, .. } => application,
        other => panic!("expected submitted application, got {other:?}"),
    }
}

pub(super) async fn active_agency(store: &MemoryStore, name: &str) -> Agency {
    let mut agency = Agency::pending(&AgencyDetails {
        name: name.to_string(),
        ..agency_details()
    });
    agency.is_active = true;
    let (agency, _) = store
        .insert_agency_if_absent(agency)
        .await
        .expect("agency stored");
    agency
}

/// Identity provider that refuses every request.
#[derive(Default)]
pub(super) struct RejectingIdentityProvider;

#[async_trait]
impl IdentityProvider for RejectingIdentityProvider {
    async fn provision(&self, identity: NewIdentity) -> Result<IdentityId, IdentityError> {
        Err(IdentityError::Rejected(format!(
            "password policy rejected credentials for {}",
            identity.email
        )))
    }
}

/// Mail transport that is always down.
#[derive(Default)]
pub(super) struct OfflineNotifier;

#[async_trait]
impl NotificationSender for OfflineNotifier {
    async fn send_welcome(&self, _message: WelcomeMessage) -> Result<(), NotificationError> {
        Err(NotificationError("smtp relay unreachable".to_string()))
    }
}

/// Store whose first open-application lookups come back empty, as if a concurrent
/// submission landed between the duplicate check and the insert.
pub(super) struct RacingStore {
    pub(super) inner: MemoryStore,
    hidden_lookups: AtomicUsize,
}

impl RacingStore {
    pub(super) fn hiding(inner: MemoryStore, lookups: usize) -> Self {
        Self {
            inner,
            hidden_lookups: AtomicUsize::new(lookups),
        }
    }
}

#[async_trait]
impl AgencyRepository for RacingStore {
    async fn search_agencies(&self, query: &str, limit: usize) -> Result<Vec<Agency>, RepositoryError> {
        self.inner.search_agencies(query, limit).await
    }

    async fn find_agency(
        &self,
        name: &str,
        city: &str,
        country: &str,
    ) -> Result<Option<Agency>, RepositoryError> {
        self.inner.find_agency(name, city, country).await
    }

    async fn insert_agency_if_absent(&self, agency: Agency) -> Result<(Agency, bool), RepositoryError> {
        self.inner.insert_agency_if_absent(agency).await
    }

    async fn fetch_agency(&self, id: AgencyId) -> Result<Option<Agency>, RepositoryError> {
        self.inner.fetch_agency(id).await
    }

    async fn update_agency(&self, agency: Agency) -> Result<(), RepositoryError> {
        self.inner.update_agency(agency).await
    }
}

#[async_trait]
impl AgentRepository for RacingStore {
    async fn insert_agent(&self, agent: Agent) -> Result<Agent, RepositoryError> {
        self.inner.insert_agent(agent).await
    }

    async fn fetch_agent(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        self.inner.fetch_agent(id).await
    }

    async fn find_agent_by_email(&self, email: &str) -> Result<Option<Agent>, RepositoryError> {
        self.inner.find_agent_by_email(email).await
    }

    async fn update_agent(&self, agent: Agent) -> Result<(), RepositoryError> {
        self.inner.update_agent(agent).await
    }
}

#[async_trait]
impl ApplicationRepository for RacingStore {
    async fn insert_application(
        &self,
        application: AgentApplication,
    ) -> Result<AgentApplication, RepositoryError> {
        self.inner.insert_application(application).await
    }

    async fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<AgentApplication>, RepositoryError> {
        self.inner.fetch_application(id).await
    }

    async fn find_open_application(
        &self,
        email: &str,
    ) -> Result<Option<AgentApplication>, RepositoryError> {
        let hide = self
            .hidden_lookups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if hide {
            return Ok(None);
        }
        self.inner.find_open_application(email).await
    }

    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        limit: usize,
    ) -> Result<Vec<AgentApplication>, RepositoryError> {
        self.inner.list_applications(status, limit).await
    }

    async fn review_application(
        &self,
        id: ApplicationId,
        review: ApplicationReview,
    ) -> Result<AgentApplication, RepositoryError> {
        self.inner.review_application(id, review).await
    }
}

/// Store that is offline for every call.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

#[async_trait]
impl AgencyRepository for UnavailableStore {
    async fn search_agencies(&self, _query: &str, _limit: usize) -> Result<Vec<Agency>, RepositoryError> {
        offline()
    }

    async fn find_agency(
        &self,
        _name: &str,
        _city: &str,
        _country: &str,
    ) -> Result<Option<Agency>, RepositoryError> {
        offline()
    }

    async fn insert_agency_if_absent(&self, _agency: Agency) -> Result<(Agency, bool), RepositoryError> {
        offline()
    }

    async fn fetch_agency(&self, _id: AgencyId) -> Result<Option<Agency>, RepositoryError> {
        offline()
    }

    async fn update_agency(&self, _agency: Agency) -> Result<(), RepositoryError> {
        offline()
    }
}

#[async_trait]
impl AgentRepository for UnavailableStore {
    async fn insert_agent(&self, _agent: Agent) -> Result<Agent, RepositoryError> {
        offline()
    }

    async fn fetch_agent(&self, _id: AgentId) -> Result<Option<Agent>, RepositoryError> {
        offline()
    }

    async fn find_agent_by_email(&self, _email: &str) -> Result<Option<Agent>, RepositoryError> {
        offline()
    }

    async fn update_agent(&self, _agent: Agent) -> Result<(), RepositoryError> {
        offline()
    }
}

#[async_trait]
impl ApplicationRepository for UnavailableStore {
    async fn insert_application(
        &self,
        _application: AgentApplication,
    ) -> Result<AgentApplication, RepositoryError> {
        offline()
    }

    async fn fetch_application(
        &self,
        _id: ApplicationId,
    ) -> Result<Option<AgentApplication>, RepositoryError> {
        offline()
    }

    async fn find_open_application(
        &self,
        _email: &str,
    ) -> Result<Option<AgentApplication>, RepositoryError> {
        offline()
    }

    async fn list_applications(
        &self,
        _status: Option<ApplicationStatus>,
        _limit: usize,
    ) -> Result<Vec<AgentApplication>, RepositoryError> {
        offline()
    }

    async fn review_application(
        &self,
        _id: ApplicationId,
        _review: ApplicationReview,
    ) -> Result<AgentApplication, RepositoryError> {
        offline()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
