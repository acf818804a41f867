use async_trait::async_trait;

use super::domain::{Agency, Agent, AgentApplication, ApplicationReview, ApplicationStatus};
use crate::ids::{AgencyId, AgentId, ApplicationId, IdentityId};
use crate::repository::RepositoryError;

#[async_trait]
pub trait AgencyRepository: Send + Sync {
    /// Active agencies whose name, city or country contains `query`, case-insensitive.
    async fn search_agencies(&self, query: &str, limit: usize) -> Result<Vec<Agency>, RepositoryError>;
    async fn find_agency(
        &self,
        name: &str,
        city: &str,
        country: &str,
    ) -> Result<Option<Agency>, RepositoryError>;
    /// Inserts unless an agency with the same name, city and country exists; returns the
    /// stored row and whether this call created it.
    async fn insert_agency_if_absent(&self, agency: Agency) -> Result<(Agency, bool), RepositoryError>;
    async fn fetch_agency(&self, id: AgencyId) -> Result<Option<Agency>, RepositoryError>;
    async fn update_agency(&self, agency: Agency) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// Fails with `Conflict` when the email already belongs to an agent.
    async fn insert_agent(&self, agent: Agent) -> Result<Agent, RepositoryError>;
    async fn fetch_agent(&self, id: AgentId) -> Result<Option<Agent>, RepositoryError>;
    async fn find_agent_by_email(&self, email: &str) -> Result<Option<Agent>, RepositoryError>;
    async fn update_agent(&self, agent: Agent) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Fails with `Conflict` while another pending application holds the email.
    async fn insert_application(
        &self,
        application: AgentApplication,
    ) -> Result<AgentApplication, RepositoryError>;
    async fn fetch_application(
        &self,
        id: ApplicationId,
    ) -> Result<Option<AgentApplication>, RepositoryError>;
    async fn find_open_application(
        &self,
        email: &str,
    ) -> Result<Option<AgentApplication>, RepositoryError>;
    /// Newest first.
    async fn list_applications(
        &self,
        status: Option<ApplicationStatus>,
        limit: usize,
    ) -> Result<Vec<AgentApplication>, RepositoryError>;
    /// Compare-and-set from `pending`: `Conflict` when the application was already
    /// reviewed, `NotFound` when it does not exist.
    async fn review_application(
        &self,
        id: ApplicationId,
        review: ApplicationReview,
    ) -> Result<AgentApplication, RepositoryError>;
}

/// Credentials to create at the external authentication provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIdentity {
    pub email: String,
    pub display_name: String,
    pub role: &'static str,
    pub temporary_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("an identity already exists for {0}")]
    AlreadyExists(String),
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn provision(&self, identity: NewIdentity) -> Result<IdentityId, IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeMessage {
    pub to: String,
    pub agent_name: String,
    pub agency_name: Option<String>,
    pub temporary_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification transport failed: {0}")]
pub struct NotificationError(pub String);

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_welcome(&self, message: WelcomeMessage) -> Result<(), NotificationError>;
}
