use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{AgencyId, AgentId, ApplicationId, IdentityId};

/// Travel agency organisation. Never deleted, only deactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub id: AgencyId,
    pub name: String,
    pub address: Option<String>,
    pub city: String,
    pub country: String,
    pub zip_code: String,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub is_active: bool,
    /// Agent currently assigned as the agency's contact.
    pub agent_id: Option<AgentId>,
    /// Set once a reviewer changes the agency's status; approvals never override it afterwards.
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Agency {
    /// Unreviewed agency created while resolving an application.
    pub fn pending(details: &AgencyDetails) -> Self {
        Self {
            id: AgencyId::generate(),
            name: details.name.clone(),
            address: details.address.clone(),
            city: details.city.clone(),
            country: details.country.clone(),
            zip_code: details.zip_code.clone(),
            email: details.email.clone(),
            telephone: details.telephone.clone(),
            is_active: false,
            agent_id: None,
            reviewed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Agencies are identified for resolution by exact name, city and country.
    pub fn matches(&self, name: &str, city: &str, country: &str) -> bool {
        self.name == name && self.city == city && self.country == country
    }
}

/// Agency display fields copied onto an agent for read-heavy dashboards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencySnapshot {
    pub agency_name: Option<String>,
    pub agency_city: Option<String>,
    pub agency_country: Option<String>,
    pub agency_zip_code: Option<String>,
    pub agency_email: Option<String>,
    pub agency_telephone: Option<String>,
}

impl AgencySnapshot {
    pub fn of(agency: &Agency) -> Self {
        Self {
            agency_name: Some(agency.name.clone()),
            agency_city: Some(agency.city.clone()),
            agency_country: Some(agency.country.clone()),
            agency_zip_code: Some(agency.zip_code.clone()),
            agency_email: agency.email.clone(),
            agency_telephone: agency.telephone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub identity_id: IdentityId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub telephone: Option<String>,
    pub agency_id: Option<AgencyId>,
    #[serde(flatten)]
    pub agency: AgencySnapshot,
    pub is_active: bool,
    pub booking_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Re-link the agent and refresh the copied agency fields. This is the only place
    /// the snapshot is written; `None` unassigns and clears it.
    pub fn sync_agency(&mut self, agency: Option<&Agency>) {
        match agency {
            Some(agency) => {
                self.agency_id = Some(agency.id);
                self.agency = AgencySnapshot::of(agency);
            }
            None => {
                self.agency_id = None;
                self.agency = AgencySnapshot::default();
            }
        }
    }

    pub fn summary(&self) -> AgentSummary {
        AgentSummary {
            id: self.id,
            name: self.full_name(),
            email: self.email.clone(),
            agency_name: self.agency.agency_name.clone(),
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentApplication {
    pub id: ApplicationId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub telephone: Option<String>,
    pub agency_id: AgencyId,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub notes: Option<String>,
}

impl AgentApplication {
    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id,
            status: self.status,
            applied_at: self.applied_at,
        }
    }
}

/// Review decision written atomically onto a pending application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationReview {
    pub status: ApplicationStatus,
    pub reviewed_at: DateTime<Utc>,
    pub reviewed_by: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub telephone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
}

/// Inbound application: the applicant plus either an agency picked from search or
/// the fields of an agency to search-or-create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    #[serde(flatten)]
    pub applicant: ApplicantDetails,
    #[serde(default)]
    pub agency_id: Option<AgencyId>,
    #[serde(default)]
    pub agency: Option<AgencyDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: AgentId,
    pub name: String,
    pub email: String,
    pub agency_name: Option<String>,
    pub is_active: bool,
}

/// Every expected outcome of a submission; storage faults travel separately as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplicationResult {
    Submitted {
        application: AgentApplication,
        agency_id: AgencyId,
        agency_created: bool,
    },
    DuplicateEmail {
        existing_application: ApplicationSummary,
    },
    DuplicateAgentEmail {
        existing_agent: AgentSummary,
    },
    ValidationFailed {
        fields: BTreeMap<String, String>,
    },
}

/// Public agency search row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencySearchHit {
    pub id: AgencyId,
    pub name: String,
    pub city: String,
    pub country: String,
    pub zip_code: String,
    pub address: Option<String>,
    pub is_active: bool,
}

impl From<Agency> for AgencySearchHit {
    fn from(agency: Agency) -> Self {
        Self {
            id: agency.id,
            name: agency.name,
            city: agency.city,
            country: agency.country,
            zip_code: agency.zip_code,
            address: agency.address,
            is_active: agency.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    Sent,
    /// Credentials exist but the welcome message did not go out; resend manually.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub agent: Agent,
    pub application: AgentApplication,
    pub temp_password: String,
    pub notification: NotificationStatus,
}
