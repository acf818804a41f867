//! Agency resolution and agent onboarding.
//!
//! Prospective agents apply against an existing agency or describe a new one, which is
//! found-or-created in an inactive state. Approval provisions credentials at the
//! identity provider, creates the agent record, activates the agency and sends a
//! welcome message; a failed message is reported but never undoes the approval.

pub mod credentials;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Agency, AgencyDetails, AgencySearchHit, AgencySnapshot, Agent, AgentApplication,
    AgentSummary, ApplicantDetails, ApplicationResult, ApplicationStatus, ApplicationSubmission,
    ApplicationSummary, ApprovalOutcome, NotificationStatus,
};
pub use repository::{
    AgencyRepository, AgentRepository, ApplicationRepository, IdentityError, IdentityProvider,
    NewIdentity, NotificationError, NotificationSender, WelcomeMessage,
};
pub use router::onboarding_router;
pub use service::{AgencyResolution, OnboardingError, OnboardingService};
