use std::sync::Arc;

use super::common::*;
use crate::repository::RepositoryError;
use crate::store::{MemoryIdentityProvider, MemoryOutbox, MemoryStore};
use crate::workflows::onboarding::credentials::TEMPORARY_PASSWORD_LENGTH;
use crate::workflows::onboarding::{
    AgencyDetails, AgencyRepository, AgentRepository, ApplicationRepository, ApplicationResult,
    ApplicationStatus, ApplicationSubmission, NotificationStatus, OnboardingError, OnboardingService,
};

#[tokio::test]
async fn submission_creates_pending_agency_once() {
    let Harness { service, store, .. } = harness();

    let first = service
        .submit_application(submission("litia@example.com"))
        .await
        .expect("first submission");
    let second = service
        .submit_application(submission("josefa@example.com"))
        .await
        .expect("second submission");

    let (first_agency, first_created) = match first {
        ApplicationResult::Submitted {
            agency_id,
            agency_created,
            ..
        } => (agency_id, agency_created),
        other => panic!("unexpected outcome {other:?}"),
    };
    let (second_agency, second_created) = match second {
        ApplicationResult::Submitted {
            agency_id,
            agency_created,
            ..
        } => (agency_id, agency_created),
        other => panic!("unexpected outcome {other:?}"),
    };

    assert!(first_created);
    assert!(!second_created);
    assert_eq!(first_agency, second_agency);

    let agency = store
        .fetch_agency(first_agency)
        .await
        .expect("fetch agency")
        .expect("agency exists");
    assert!(!agency.is_active);
    assert_eq!(agency.agent_id, None);
}

#[tokio::test]
async fn resolution_ignores_surrounding_whitespace() {
    let Harness { service, .. } = harness();

    let created = service
        .resolve_agency(&agency_details())
        .await
        .expect("resolve");
    let padded = AgencyDetails {
        name: "  Coral Coast Journeys ".to_string(),
        city: " Nadi".to_string(),
        country: "Fiji  ".to_string(),
        ..agency_details()
    };
    let resolved = service.resolve_agency(&padded).await.expect("resolve again");

    assert!(created.created);
    assert!(!resolved.created);
    assert_eq!(created.agency_id, resolved.agency_id);
}

#[tokio::test]
async fn duplicate_open_application_is_reported() {
    let Harness { service, .. } = harness();
    let original = submitted(&service, "litia@example.com").await;

    let outcome = service
        .submit_application(submission("  LITIA@example.com "))
        .await
        .expect("duplicate check");

    match outcome {
        ApplicationResult::DuplicateEmail {
            existing_application,
        } => {
            assert_eq!(existing_application.id, original.id);
            assert_eq!(existing_application.status, ApplicationStatus::Pending);
        }
        other => panic!("expected duplicate email, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_duplicate_insert_resolves_to_duplicate_email() {
    let memory = MemoryStore::default();
    let store = Arc::new(RacingStore::hiding(memory.clone(), 1));
    let service = OnboardingService::new(
        store,
        Arc::new(MemoryIdentityProvider::default()),
        Arc::new(MemoryOutbox::default()),
    );
    let first = OnboardingService::new(
        Arc::new(memory.clone()),
        Arc::new(MemoryIdentityProvider::default()),
        Arc::new(MemoryOutbox::default()),
    );
    let original = submitted(&first, "litia@example.com").await;

    let outcome = service
        .submit_application(submission("litia@example.com"))
        .await
        .expect("conflict is an expected outcome");

    match outcome {
        ApplicationResult::DuplicateEmail {
            existing_application,
        } => assert_eq!(existing_application.id, original.id),
        other => panic!("expected duplicate email, got {other:?}"),
    }
    let pending = memory
        .list_applications(Some(ApplicationStatus::Pending), 10)
        .await
        .expect("list");
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn unknown_agency_id_fails_validation() {
    let Harness { service, .. } = harness();
    let mut input = submission("litia@example.com");
    input.agency = None;
    input.agency_id = Some(crate::ids::AgencyId::generate());

    let outcome = service.submit_application(input).await.expect("validated");

    match outcome {
        ApplicationResult::ValidationFailed { fields } => {
            assert!(fields.contains_key("agency_id"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn approval_creates_agent_and_activates_agency() {
    let Harness {
        service,
        store,
        identities,
        outbox,
    } = harness();
    let application = submitted(&service, "litia@example.com").await;
    let reviewer = admin();

    let outcome = service
        .approve_application(&reviewer, application.id, Some("  welcome aboard ".to_string()))
        .await
        .expect("approval succeeds");

    assert_eq!(outcome.application.status, ApplicationStatus::Approved);
    assert_eq!(outcome.application.reviewed_by, Some(reviewer.actor_id));
    assert_eq!(outcome.application.notes.as_deref(), Some("welcome aboard"));
    assert_eq!(outcome.notification, NotificationStatus::Sent);
    assert_eq!(outcome.temp_password.chars().count(), TEMPORARY_PASSWORD_LENGTH);

    let agent = &outcome.agent;
    assert!(agent.is_active);
    assert_eq!(agent.agency_id, Some(application.agency_id));
    assert_eq!(
        agent.agency.agency_name.as_deref(),
        Some("Coral Coast Journeys")
    );
    assert_eq!(identities.identity_for("litia@example.com"), Some(agent.identity_id));

    let agency = store
        .fetch_agency(application.agency_id)
        .await
        .expect("fetch agency")
        .expect("agency exists");
    assert!(agency.is_active);
    assert_eq!(agency.agent_id, Some(agent.id));

    let messages = outbox.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].to, "litia@example.com");
    assert_eq!(messages[0].temporary_password, outcome.temp_password);
}

#[tokio::test]
async fn approving_twice_reports_already_processed() {
    let Harness {
        service, outbox, ..
    } = harness();
    let application = submitted(&service, "litia@example.com").await;

    service
        .approve_application(&admin(), application.id, None)
        .await
        .expect("first approval");
    let second = service
        .approve_application(&admin(), application.id, None)
        .await;

    match second {
        Err(OnboardingError::AlreadyProcessed { id, status }) => {
            assert_eq!(id, application.id);
            assert_eq!(status, ApplicationStatus::Approved);
        }
        other => panic!("expected already processed, got {other:?}"),
    }
    assert_eq!(outbox.messages().len(), 1);
}

#[tokio::test]
async fn rejected_application_cannot_be_approved() {
    let Harness { service, .. } = harness();
    let application = submitted(&service, "litia@example.com").await;

    let rejected = service
        .reject_application(&admin(), application.id, Some("incomplete licence".to_string()))
        .await
        .expect("rejection");
    assert_eq!(rejected.status, ApplicationStatus::Rejected);

    let approval = service
        .approve_application(&admin(), application.id, None)
        .await;
    assert!(matches!(
        approval,
        Err(OnboardingError::AlreadyProcessed {
            status: ApplicationStatus::Rejected,
            ..
        })
    ));
}

#[tokio::test]
async fn identity_failure_leaves_application_pending() {
    let store = Arc::new(MemoryStore::default());
    let service = OnboardingService::new(
        store.clone(),
        Arc::new(RejectingIdentityProvider),
        Arc::new(MemoryOutbox::default()),
    );
    let application = match service
        .submit_application(submission("litia@example.com"))
        .await
        .expect("submission")
    {
        ApplicationResult::Submitted { application, .. } => application,
        other => panic!("unexpected outcome {other:?}"),
    };

    let result = service
        .approve_application(&admin(), application.id, None)
        .await;

    assert!(matches!(result, Err(OnboardingError::IdentityProvisioning(_))));
    assert!(store
        .find_agent_by_email("litia@example.com")
        .await
        .expect("lookup")
        .is_none());
    let stored = store
        .fetch_application(application.id)
        .await
        .expect("fetch")
        .expect("application exists");
    assert_eq!(stored.status, ApplicationStatus::Pending);
}

#[tokio::test]
async fn notification_failure_does_not_undo_approval() {
    let store = Arc::new(MemoryStore::default());
    let service = OnboardingService::new(
        store.clone(),
        Arc::new(MemoryIdentityProvider::default()),
        Arc::new(OfflineNotifier),
    );
    let application = match service
        .submit_application(submission("litia@example.com"))
        .await
        .expect("submission")
    {
        ApplicationResult::Submitted { application, .. } => application,
        other => panic!("unexpected outcome {other:?}"),
    };

    let outcome = service
        .approve_application(&admin(), application.id, None)
        .await
        .expect("approval survives mail outage");

    assert!(matches!(
        outcome.notification,
        NotificationStatus::Failed { ref reason } if reason.contains("smtp")
    ));
    assert!(store
        .fetch_agent(outcome.agent.id)
        .await
        .expect("lookup")
        .is_some());
}

#[tokio::test]
async fn only_reviewers_decide_applications() {
    let Harness { service, .. } = harness();
    let application = submitted(&service, "litia@example.com").await;

    let result = service
        .approve_application(&resort_manager(), application.id, None)
        .await;

    assert!(matches!(result, Err(OnboardingError::Forbidden(_))));
}

#[tokio::test]
async fn active_agent_email_blocks_new_application() {
    let Harness { service, .. } = harness();
    let application = submitted(&service, "litia@example.com").await;
    service
        .approve_application(&admin(), application.id, None)
        .await
        .expect("approval");

    let outcome = service
        .submit_application(submission("litia@example.com"))
        .await
        .expect("checked");

    match outcome {
        ApplicationResult::DuplicateAgentEmail { existing_agent } => {
            assert_eq!(existing_agent.name, "Litia Naivalu");
            assert!(existing_agent.is_active);
        }
        other => panic!("expected duplicate agent email, got {other:?}"),
    }
}

#[tokio::test]
async fn reassignment_moves_snapshot_and_back_references() {
    let Harness { service, store, .. } = harness();
    let application = submitted(&service, "litia@example.com").await;
    let agent = service
        .approve_application(&admin(), application.id, None)
        .await
        .expect("approval")
        .agent;
    let original_agency = application.agency_id;
    let target = active_agency(&store, "Pacific Isles Travel").await;

    let moved = service
        .assign_agent_to_agency(&admin(), agent.id, Some(target.id))
        .await
        .expect("reassignment");

    assert_eq!(moved.agency_id, Some(target.id));
    assert_eq!(
        moved.agency.agency_name.as_deref(),
        Some("Pacific Isles Travel")
    );
    let old = store
        .fetch_agency(original_agency)
        .await
        .expect("fetch")
        .expect("exists");
    assert_eq!(old.agent_id, None);
    let new = store
        .fetch_agency(target.id)
        .await
        .expect("fetch")
        .expect("exists");
    assert_eq!(new.agent_id, Some(agent.id));

    let unassigned = service
        .assign_agent_to_agency(&admin(), agent.id, None)
        .await
        .expect("unassign");
    assert_eq!(unassigned.agency_id, None);
    assert_eq!(unassigned.agency.agency_name, None);
}

#[tokio::test]
async fn inactive_agency_cannot_take_agents() {
    let Harness { service, store, .. } = harness();
    let application = submitted(&service, "litia@example.com").await;
    let agent = service
        .approve_application(&admin(), application.id, None)
        .await
        .expect("approval")
        .agent;
    let target = active_agency(&store, "Reef Runner Tours").await;
    service
        .set_agency_active(&admin(), target.id, false)
        .await
        .expect("deactivate");

    let result = service
        .assign_agent_to_agency(&admin(), agent.id, Some(target.id))
        .await;

    assert!(matches!(result, Err(OnboardingError::AgencyInactive(id)) if id == target.id));
}

#[tokio::test]
async fn approval_keeps_a_deactivated_agency_inactive() {
    let Harness { service, store, .. } = harness();
    let agency = active_agency(&store, "Reef Runner Tours").await;
    service
        .set_agency_active(&admin(), agency.id, false)
        .await
        .expect("deactivate");
    let application = match service
        .submit_application(ApplicationSubmission {
            agency_id: Some(agency.id),
            agency: None,
            ..submission("sione@example.com")
        })
        .await
        .expect("submission")
    {
        ApplicationResult::Submitted { application, .. } => application,
        other => panic!("expected submitted application, got {other:?}"),
    };

    let outcome = service
        .approve_application(&admin(), application.id, None)
        .await
        .expect("approval");

    assert_eq!(outcome.agent.agency_id, Some(agency.id));
    let stored = store
        .fetch_agency(agency.id)
        .await
        .expect("fetch agency")
        .expect("agency exists");
    assert!(!stored.is_active);
    assert!(stored.reviewed_at.is_some());
}

#[tokio::test]
async fn search_returns_only_active_agencies() {
    let Harness { service, store, .. } = harness();
    submitted(&service, "litia@example.com").await;
    active_agency(&store, "Coral Reef Escapes").await;

    let hits = service.search_agencies("coral").await.expect("search");

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Coral Reef Escapes");
    assert!(matches!(
        service.search_agencies("   ").await,
        Err(OnboardingError::EmptyQuery)
    ));
}

#[tokio::test]
async fn storage_outage_surfaces_as_repository_error() {
    let service = OnboardingService::new(
        Arc::new(UnavailableStore),
        Arc::new(MemoryIdentityProvider::default()),
        Arc::new(MemoryOutbox::default()),
    );

    let result = service
        .submit_application(submission("litia@example.com"))
        .await;

    assert!(matches!(
        result,
        Err(OnboardingError::Repository(RepositoryError::Unavailable(_)))
    ));
}
