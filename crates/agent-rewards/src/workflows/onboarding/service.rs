use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::credentials::generate_temporary_password;
use super::domain::{
    Agency, AgencyDetails, AgencySearchHit, AgencySnapshot, Agent, AgentApplication,
    ApplicantDetails, ApplicationResult, ApplicationReview, ApplicationStatus,
    ApplicationSubmission, ApprovalOutcome, NotificationStatus,
};
use super::repository::{
    AgencyRepository, AgentRepository, ApplicationRepository, IdentityError, IdentityProvider,
    NewIdentity, NotificationSender, WelcomeMessage,
};
use crate::auth::{AccessDenied, AuthContext};
use crate::ids::{AgencyId, AgentId, ApplicationId, IdentityId};
use crate::repository::RepositoryError;

pub const AGENCY_SEARCH_LIMIT: usize = 10;
pub const APPLICATION_LIST_LIMIT: usize = 100;

/// Where an application's agency came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgencyResolution {
    pub agency_id: AgencyId,
    pub created: bool,
}

enum AgencyChoice {
    Existing(AgencyId),
    New(AgencyDetails),
}

struct ValidSubmission {
    applicant: ApplicantDetails,
    agency: AgencyChoice,
}

pub struct OnboardingService<S, I, N> {
    store: Arc<S>,
    identities: Arc<I>,
    notifier: Arc<N>,
}

impl<S, I, N> OnboardingService<S, I, N>
where
    S: AgencyRepository + AgentRepository + ApplicationRepository + 'static,
    I: IdentityProvider + 'static,
    N: NotificationSender + 'static,
{
    pub fn new(store: Arc<S>, identities: Arc<I>, notifier: Arc<N>) -> Self {
        Self {
            store,
            identities,
            notifier,
        }
    }

    pub async fn search_agencies(&self, query: &str) -> Result<Vec<AgencySearchHit>, OnboardingError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(OnboardingError::EmptyQuery);
        }

        let agencies = self
            .store
            .search_agencies(query, AGENCY_SEARCH_LIMIT)
            .await?;
        Ok(agencies.into_iter().map(AgencySearchHit::from).collect())
    }

    /// Exact match on trimmed name, city and country, otherwise a new inactive agency.
    /// Concurrent resolutions of the same agency converge on one row.
    pub async fn resolve_agency(&self, details: &AgencyDetails) -> Result<AgencyResolution, OnboardingError> {
        let details = trimmed_agency(details);

        if let Some(existing) = self
            .store
            .find_agency(&details.name, &details.city, &details.country)
            .await?
        {
            return Ok(AgencyResolution {
                agency_id: existing.id,
                created: false,
            });
        }

        let (agency, created) = self
            .store
            .insert_agency_if_absent(Agency::pending(&details))
            .await?;
        if created {
            info!(agency_id = %agency.id, name = %agency.name, "agency created pending review");
        }

        Ok(AgencyResolution {
            agency_id: agency.id,
            created,
        })
    }

    pub async fn submit_application(
        &self,
        submission: ApplicationSubmission,
    ) -> Result<ApplicationResult, OnboardingError> {
        let valid = match validate_submission(submission) {
            Ok(valid) => valid,
            Err(fields) => return Ok(ApplicationResult::ValidationFailed { fields }),
        };
        let applicant = valid.applicant;

        if let Some(existing) = self.store.find_open_application(&applicant.email).await? {
            return Ok(ApplicationResult::DuplicateEmail {
                existing_application: existing.summary(),
            });
        }

        if let Some(agent) = self.store.find_agent_by_email(&applicant.email).await? {
            if agent.is_active {
                return Ok(ApplicationResult::DuplicateAgentEmail {
                    existing_agent: agent.summary(),
                });
            }
        }

        let resolution = match valid.agency {
            AgencyChoice::Existing(agency_id) => {
                if self.store.fetch_agency(agency_id).await?.is_none() {
                    return Ok(ApplicationResult::ValidationFailed {
                        fields: BTreeMap::from([(
                            "agency_id".to_string(),
                            "does not match a known agency".to_string(),
                        )]),
                    });
                }
                AgencyResolution {
                    agency_id,
                    created: false,
                }
            }
            AgencyChoice::New(details) => self.resolve_agency(&details).await?,
        };

        let application = AgentApplication {
            id: ApplicationId::generate(),
            first_name: applicant.first_name,
            last_name: applicant.last_name,
            email: applicant.email,
            telephone: applicant.telephone,
            agency_id: resolution.agency_id,
            status: ApplicationStatus::Pending,
            applied_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            notes: None,
        };
        let email = application.email.clone();

        match self.store.insert_application(application).await {
            Ok(application) => {
                info!(
                    application_id = %application.id,
                    agency_id = %resolution.agency_id,
                    agency_created = resolution.created,
                    "agent application submitted"
                );
                Ok(ApplicationResult::Submitted {
                    application,
                    agency_id: resolution.agency_id,
                    agency_created: resolution.created,
                })
            }
            Err(RepositoryError::Conflict) => match self.store.find_open_application(&email).await? {
                Some(existing) => Ok(ApplicationResult::DuplicateEmail {
                    existing_application: existing.summary(),
                }),
                None => Err(RepositoryError::Conflict.into()),
            },
            Err(err) => Err(err.into()),
        }
    }

    pub async fn list_applications(
        &self,
        ctx: &AuthContext,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<AgentApplication>, OnboardingError> {
        ctx.require_reviewer("list applications")?;
        Ok(self
            .store
            .list_applications(status, APPLICATION_LIST_LIMIT)
            .await?)
    }

    pub async fn approve_application(
        &self,
        ctx: &AuthContext,
        application_id: ApplicationId,
        notes: Option<String>,
    ) -> Result<ApprovalOutcome, OnboardingError> {
        ctx.require_reviewer("approve applications")?;

        let application = self.pending_application(application_id).await?;

        if let Some(existing) = self.store.find_agent_by_email(&application.email).await? {
            return Err(OnboardingError::AgentEmailTaken {
                email: existing.email,
            });
        }

        let agency = self.store.fetch_agency(application.agency_id).await?;
        let display_name = format!("{} {}", application.first_name, application.last_name);
        let temp_password = generate_temporary_password();

        let identity_id = self
            .identities
            .provision(NewIdentity {
                email: application.email.clone(),
                display_name: display_name.clone(),
                role: "agent",
                temporary_password: temp_password.clone(),
            })
            .await
            .map_err(|err| {
                warn!(application_id = %application_id, error = %err, "identity provisioning failed");
                OnboardingError::IdentityProvisioning(err)
            })?;

        let mut agent = Agent {
            id: AgentId::generate(),
            identity_id,
            first_name: application.first_name.clone(),
            last_name: application.last_name.clone(),
            email: application.email.clone(),
            telephone: application.telephone.clone(),
            agency_id: None,
            agency: AgencySnapshot::default(),
            is_active: true,
            booking_count: 0,
            created_at: Utc::now(),
        };
        agent.sync_agency(agency.as_ref());

        let agent = match self.store.insert_agent(agent).await {
            Ok(agent) => agent,
            Err(source) => {
                error!(
                    application_id = %application_id,
                    identity_id = %identity_id,
                    error = %source,
                    "identity provisioned but agent record failed; identity needs manual cleanup"
                );
                return Err(OnboardingError::AgentRecordFailed {
                    identity_id,
                    source,
                });
            }
        };

        let review = ApplicationReview {
            status: ApplicationStatus::Approved,
            reviewed_at: Utc::now(),
            reviewed_by: ctx.actor_id,
            notes: clean_notes(notes),
        };
        let application = match self.store.review_application(application_id, review).await {
            Ok(application) => application,
            Err(RepositoryError::Conflict) => {
                error!(
                    application_id = %application_id,
                    agent_id = %agent.id,
                    "application reviewed concurrently after agent creation"
                );
                return Err(self.already_processed(application_id).await);
            }
            Err(err) => return Err(err.into()),
        };

        if let Some(agency) = agency {
            self.adopt_agency(agency, agent.id).await;
        }

        let notification = match self
            .notifier
            .send_welcome(WelcomeMessage {
                to: agent.email.clone(),
                agent_name: display_name,
                agency_name: agent.agency.agency_name.clone(),
                temporary_password: temp_password.clone(),
            })
            .await
        {
            Ok(()) => NotificationStatus::Sent,
            Err(err) => {
                warn!(agent_id = %agent.id, error = %err, "welcome notification failed");
                NotificationStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };

        info!(
            application_id = %application.id,
            agent_id = %agent.id,
            reviewer = %ctx.actor_id,
            "agent application approved"
        );

        Ok(ApprovalOutcome {
            agent,
            application,
            temp_password,
            notification,
        })
    }

    pub async fn reject_application(
        &self,
        ctx: &AuthContext,
        application_id: ApplicationId,
        notes: Option<String>,
    ) -> Result<AgentApplication, OnboardingError> {
        ctx.require_reviewer("reject applications")?;
        self.pending_application(application_id).await?;

        let review = ApplicationReview {
            status: ApplicationStatus::Rejected,
            reviewed_at: Utc::now(),
            reviewed_by: ctx.actor_id,
            notes: clean_notes(notes),
        };
        match self.store.review_application(application_id, review).await {
            Ok(application) => {
                info!(application_id = %application_id, reviewer = %ctx.actor_id, "agent application rejected");
                Ok(application)
            }
            Err(RepositoryError::Conflict) => Err(self.already_processed(application_id).await),
            Err(RepositoryError::NotFound) => Err(OnboardingError::ApplicationNotFound(application_id)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn set_agency_active(
        &self,
        ctx: &AuthContext,
        agency_id: AgencyId,
        is_active: bool,
    ) -> Result<Agency, OnboardingError> {
        ctx.require_reviewer("change agency status")?;

        let mut agency = self
            .store
            .fetch_agency(agency_id)
            .await?
            .ok_or(OnboardingError::AgencyNotFound(agency_id))?;
        let changed = agency.is_active != is_active;
        agency.is_active = is_active;
        agency.reviewed_at = Some(Utc::now());
        self.store.update_agency(agency.clone()).await?;
        if changed {
            info!(agency_id = %agency_id, is_active, "agency status changed");
        }
        Ok(agency)
    }

    /// Moves an agent to `agency_id` (or unassigns with `None`), refreshing the agent's
    /// agency snapshot and both agencies' back-references.
    pub async fn assign_agent_to_agency(
        &self,
        ctx: &AuthContext,
        agent_id: AgentId,
        agency_id: Option<AgencyId>,
    ) -> Result<Agent, OnboardingError> {
        ctx.require_reviewer("assign agents")?;

        let mut agent = self
            .store
            .fetch_agent(agent_id)
            .await?
            .ok_or(OnboardingError::AgentNotFound(agent_id))?;
        let previous = agent.agency_id;

        let target = match agency_id {
            Some(id) => {
                let agency = self
                    .store
                    .fetch_agency(id)
                    .await?
                    .ok_or(OnboardingError::AgencyNotFound(id))?;
                if !agency.is_active {
                    return Err(OnboardingError::AgencyInactive(id));
                }
                Some(agency)
            }
            None => None,
        };

        agent.sync_agency(target.as_ref());
        self.store.update_agent(agent.clone()).await?;

        if let Some(previous_id) = previous.filter(|id| Some(*id) != agency_id) {
            if let Some(mut old) = self.store.fetch_agency(previous_id).await? {
                if old.agent_id == Some(agent_id) {
                    old.agent_id = None;
                    self.store.update_agency(old).await?;
                }
            }
        }

        if let Some(mut agency) = target {
            if agency.agent_id != Some(agent_id) {
                agency.agent_id = Some(agent_id);
                self.store.update_agency(agency).await?;
            }
        }

        info!(
            agent_id = %agent_id,
            from = ?previous,
            to = ?agency_id,
            "agent agency assignment changed"
        );
        Ok(agent)
    }

    async fn pending_application(&self, id: ApplicationId) -> Result<AgentApplication, OnboardingError> {
        let application = self
            .store
            .fetch_application(id)
            .await?
            .ok_or(OnboardingError::ApplicationNotFound(id))?;
        if application.status.is_terminal() {
            return Err(OnboardingError::AlreadyProcessed {
                id,
                status: application.status,
            });
        }
        Ok(application)
    }

    async fn already_processed(&self, id: ApplicationId) -> OnboardingError {
        match self.store.fetch_application(id).await {
            Ok(Some(application)) => OnboardingError::AlreadyProcessed {
                id,
                status: application.status,
            },
            Ok(None) => OnboardingError::ApplicationNotFound(id),
            Err(err) => err.into(),
        }
    }

    /// Approving an agent implicitly approves a never-reviewed agency and names the agent as
    /// contact when the agency has none. The agent already exists, so failures are only logged.
    async fn adopt_agency(&self, mut agency: Agency, agent_id: AgentId) {
        let mut changed = false;
        if !agency.is_active && agency.reviewed_at.is_none() {
            agency.is_active = true;
            agency.reviewed_at = Some(Utc::now());
            changed = true;
        }
        if agency.agent_id.is_none() {
            agency.agent_id = Some(agent_id);
            changed = true;
        }
        if !changed {
            return;
        }

        let agency_id = agency.id;
        match self.store.update_agency(agency).await {
            Ok(()) => info!(agency_id = %agency_id, agent_id = %agent_id, "agency activated with approved agent"),
            Err(err) => error!(
                agency_id = %agency_id,
                agent_id = %agent_id,
                error = %err,
                "failed to activate agency after approval"
            ),
        }
    }
}

fn validate_submission(submission: ApplicationSubmission) -> Result<ValidSubmission, BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    let ApplicationSubmission {
        applicant,
        agency_id,
        agency,
    } = submission;

    let first_name = applicant.first_name.trim().to_string();
    let last_name = applicant.last_name.trim().to_string();
    let email = applicant.email.trim().to_ascii_lowercase();

    if first_name.is_empty() {
        fields.insert("first_name".to_string(), "is required".to_string());
    }
    if last_name.is_empty() {
        fields.insert("last_name".to_string(), "is required".to_string());
    }
    if email.is_empty() {
        fields.insert("email".to_string(), "is required".to_string());
    } else if !looks_like_email(&email) {
        fields.insert("email".to_string(), "must be a valid email address".to_string());
    }

    let choice = match (agency_id, agency) {
        (Some(_), Some(_)) => {
            fields.insert(
                "agency".to_string(),
                "provide either agency_id or agency details, not both".to_string(),
            );
            None
        }
        (Some(id), None) => Some(AgencyChoice::Existing(id)),
        (None, Some(details)) => {
            let details = trimmed_agency(&details);
            for (key, value) in [
                ("agency.name", &details.name),
                ("agency.city", &details.city),
                ("agency.country", &details.country),
                ("agency.zip_code", &details.zip_code),
            ] {
                if value.is_empty() {
                    fields.insert(key.to_string(), "is required".to_string());
                }
            }
            Some(AgencyChoice::New(details))
        }
        (None, None) => {
            fields.insert(
                "agency".to_string(),
                "choose an existing agency or provide agency details".to_string(),
            );
            None
        }
    };

    match choice {
        Some(agency) if fields.is_empty() => Ok(ValidSubmission {
            applicant: ApplicantDetails {
                first_name,
                last_name,
                email,
                telephone: non_blank(applicant.telephone),
            },
            agency,
        }),
        _ => Err(fields),
    }
}

fn trimmed_agency(details: &AgencyDetails) -> AgencyDetails {
    AgencyDetails {
        name: details.name.trim().to_string(),
        city: details.city.trim().to_string(),
        country: details.country.trim().to_string(),
        zip_code: details.zip_code.trim().to_string(),
        address: non_blank(details.address.clone()),
        email: non_blank(details.email.clone()).map(|email| email.to_ascii_lowercase()),
        telephone: non_blank(details.telephone.clone()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn clean_notes(notes: Option<String>) -> Option<String> {
    non_blank(notes)
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error("search query must not be empty")]
    EmptyQuery,
    #[error("application {0} not found")]
    ApplicationNotFound(ApplicationId),
    #[error("application {id} was already {}", .status.label())]
    AlreadyProcessed {
        id: ApplicationId,
        status: ApplicationStatus,
    },
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),
    #[error("agency {0} not found")]
    AgencyNotFound(AgencyId),
    #[error("agency {0} is inactive")]
    AgencyInactive(AgencyId),
    #[error("an agent already exists for {email}")]
    AgentEmailTaken { email: String },
    #[error("identity provisioning failed: {0}")]
    IdentityProvisioning(IdentityError),
    #[error("agent record could not be stored for identity {identity_id}: {source}")]
    AgentRecordFailed {
        identity_id: IdentityId,
        source: RepositoryError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
