//! Explicit actor identity passed into every operation that needs one.
//!
//! Session handling lives with the upstream authentication provider; by the time a
//! request reaches this crate the provider has resolved the caller and forwards it in
//! the `x-actor-*` headers read by the [`AuthContext`] extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::ids::AgentId;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const AGENT_ID_HEADER: &str = "x-agent-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    RegionalManager,
    ResortManager,
    Agent,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::RegionalManager => "regional_manager",
            ActorRole::ResortManager => "resort_manager",
            ActorRole::Agent => "agent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "regional_manager" => Some(Self::RegionalManager),
            "resort_manager" => Some(Self::ResortManager),
            "agent" => Some(Self::Agent),
            _ => None,
        }
    }

    const fn reviews_applications(self) -> bool {
        matches!(self, ActorRole::Admin | ActorRole::RegionalManager)
    }

    const fn manages_catalog(self) -> bool {
        matches!(self, ActorRole::Admin | ActorRole::ResortManager)
    }
}

/// The authenticated caller of a core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub actor_id: Uuid,
    pub role: ActorRole,
    /// Agent record owned by the caller; only set for `agent` actors.
    pub agent_id: Option<AgentId>,
}

impl AuthContext {
    pub fn admin(actor_id: Uuid) -> Self {
        Self {
            actor_id,
            role: ActorRole::Admin,
            agent_id: None,
        }
    }

    pub fn agent(actor_id: Uuid, agent_id: AgentId) -> Self {
        Self {
            actor_id,
            role: ActorRole::Agent,
            agent_id: Some(agent_id),
        }
    }

    pub fn with_role(actor_id: Uuid, role: ActorRole) -> Self {
        Self {
            actor_id,
            role,
            agent_id: None,
        }
    }

    /// Approve/reject applications, verify bookings, settle redemptions, manage agencies.
    pub fn require_reviewer(&self, action: &'static str) -> Result<(), AccessDenied> {
        if self.role.reviews_applications() {
            Ok(())
        } else {
            Err(self.denied(action))
        }
    }

    pub fn require_catalog_manager(&self, action: &'static str) -> Result<(), AccessDenied> {
        if self.role.manages_catalog() {
            Ok(())
        } else {
            Err(self.denied(action))
        }
    }

    /// Reviewers may act for any agent; an agent only for itself.
    pub fn require_agent_access(
        &self,
        agent_id: AgentId,
        action: &'static str,
    ) -> Result<(), AccessDenied> {
        let owns_record = self.role == ActorRole::Agent && self.agent_id == Some(agent_id);
        if self.role.reviews_applications() || owns_record {
            Ok(())
        } else {
            Err(self.denied(action))
        }
    }

    fn denied(&self, action: &'static str) -> AccessDenied {
        AccessDenied {
            role: self.role.label(),
            action,
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthContextError> {
        let actor_id = header_value(headers, ACTOR_ID_HEADER)?;
        let actor_id = Uuid::parse_str(actor_id)
            .map_err(|_| AuthContextError::Invalid(ACTOR_ID_HEADER))?;

        let role = header_value(headers, ACTOR_ROLE_HEADER)?;
        let role = ActorRole::parse(role).ok_or(AuthContextError::Invalid(ACTOR_ROLE_HEADER))?;

        // Only agent actors own an agent record; the header is ignored for other roles.
        let agent_id = match headers.get(AGENT_ID_HEADER).filter(|_| role == ActorRole::Agent) {
            Some(value) => {
                let raw = value
                    .to_str()
                    .map_err(|_| AuthContextError::Invalid(AGENT_ID_HEADER))?;
                let id = Uuid::parse_str(raw.trim())
                    .map_err(|_| AuthContextError::Invalid(AGENT_ID_HEADER))?;
                Some(AgentId(id))
            }
            None => None,
        };

        if role == ActorRole::Agent && agent_id.is_none() {
            return Err(AuthContextError::Missing(AGENT_ID_HEADER));
        }

        Ok(Self {
            actor_id,
            role,
            agent_id,
        })
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AuthContextError> {
    headers
        .get(name)
        .ok_or(AuthContextError::Missing(name))?
        .to_str()
        .map(str::trim)
        .map_err(|_| AuthContextError::Invalid(name))
}

/// The caller's role does not permit the attempted action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{role} may not {action}")]
pub struct AccessDenied {
    pub role: &'static str,
    pub action: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthContextError {
    #[error("missing {0} header")]
    Missing(&'static str),
    #[error("invalid {0} header")]
    Invalid(&'static str),
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        AuthContext::from_headers(&parts.headers).map_err(|err| {
            let payload = json!({
                "error": "unauthenticated",
                "message": err.to_string(),
            });
            (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
        })
    }
}
