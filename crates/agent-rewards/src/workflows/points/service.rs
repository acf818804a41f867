use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{
    PointsBalance, Redemption, RedemptionRequest, RedemptionSettlement, RedemptionStatus,
    ReserveOutcome, VoucherOption,
};
use super::ledger::{QuoteError, RedemptionPolicy};
use super::repository::LedgerRepository;
use crate::auth::{AccessDenied, AuthContext};
use crate::ids::{AgentId, RedemptionId};
use crate::repository::RepositoryError;
use crate::workflows::onboarding::AgentRepository;

pub struct PointsService<S> {
    store: Arc<S>,
    policy: RedemptionPolicy,
}

impl<S> PointsService<S>
where
    S: LedgerRepository + AgentRepository + 'static,
{
    pub fn new(store: Arc<S>, policy: RedemptionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &RedemptionPolicy {
        &self.policy
    }

    pub fn voucher_options(&self) -> &[VoucherOption] {
        &self.policy.vouchers
    }

    pub async fn balance(&self, ctx: &AuthContext, agent_id: AgentId) -> Result<PointsBalance, PointsError> {
        ctx.require_agent_access(agent_id, "view points")?;
        self.agent_is_active(agent_id).await?;

        let totals = self.store.ledger_totals(agent_id).await?;
        Ok(self.policy.balance(&totals))
    }

    /// All-or-nothing: the pending redemption is stored only if the full amount is
    /// available at commit time.
    pub async fn redeem(
        &self,
        ctx: &AuthContext,
        agent_id: AgentId,
        request: RedemptionRequest,
    ) -> Result<Redemption, PointsError> {
        ctx.require_agent_access(agent_id, "redeem points")?;

        let quote = self
            .policy
            .quote(request.points, request.voucher_code.as_deref())?;

        if !self.agent_is_active(agent_id).await? {
            return Err(PointsError::AgentInactive(agent_id));
        }

        let redemption = Redemption {
            id: RedemptionId::generate(),
            agent_id,
            points_used: quote.points,
            redemption_type: quote.redemption_type,
            redemption_value: quote.value,
            status: RedemptionStatus::Pending,
            created_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            notes: None,
        };

        match self.store.reserve_redemption(redemption).await? {
            ReserveOutcome::Reserved(redemption) => {
                info!(
                    redemption_id = %redemption.id,
                    agent_id = %agent_id,
                    points = %redemption.points_used,
                    value = %redemption.redemption_value,
                    redemption_type = %redemption.redemption_type,
                    "points reserved for redemption"
                );
                Ok(redemption)
            }
            ReserveOutcome::Insufficient { available } => {
                warn!(
                    agent_id = %agent_id,
                    requested = %request.points,
                    available = %available,
                    "redemption exceeds available points"
                );
                Err(PointsError::InsufficientPoints {
                    requested: request.points,
                    available,
                })
            }
        }
    }

    pub async fn list_redemptions(
        &self,
        ctx: &AuthContext,
        agent_id: AgentId,
    ) -> Result<Vec<Redemption>, PointsError> {
        ctx.require_agent_access(agent_id, "list redemptions")?;
        Ok(self.store.list_redemptions(agent_id).await?)
    }

    pub async fn complete_redemption(
        &self,
        ctx: &AuthContext,
        redemption_id: RedemptionId,
        notes: Option<String>,
    ) -> Result<Redemption, PointsError> {
        ctx.require_reviewer("complete redemptions")?;
        self.settle(ctx, redemption_id, RedemptionStatus::Completed, notes)
            .await
    }

    /// Rejection releases the reserved points back to the agent.
    pub async fn reject_redemption(
        &self,
        ctx: &AuthContext,
        redemption_id: RedemptionId,
        notes: Option<String>,
    ) -> Result<Redemption, PointsError> {
        ctx.require_reviewer("reject redemptions")?;
        self.settle(ctx, redemption_id, RedemptionStatus::Rejected, notes)
            .await
    }

    async fn settle(
        &self,
        ctx: &AuthContext,
        redemption_id: RedemptionId,
        status: RedemptionStatus,
        notes: Option<String>,
    ) -> Result<Redemption, PointsError> {
        let settlement = RedemptionSettlement {
            status,
            processed_at: Utc::now(),
            processed_by: ctx.actor_id,
            notes: notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
        };

        match self
            .store
            .settle_redemption(redemption_id, settlement)
            .await
        {
            Ok(redemption) => {
                info!(
                    redemption_id = %redemption_id,
                    status = status.label(),
                    reviewer = %ctx.actor_id,
                    "redemption settled"
                );
                Ok(redemption)
            }
            Err(RepositoryError::NotFound) => Err(PointsError::RedemptionNotFound(redemption_id)),
            Err(RepositoryError::Conflict) => {
                let current = self
                    .store
                    .fetch_redemption(redemption_id)
                    .await?
                    .ok_or(PointsError::RedemptionNotFound(redemption_id))?;
                Err(PointsError::AlreadyProcessed {
                    id: redemption_id,
                    status: current.status,
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// `AgentNotFound` for unknown agents, otherwise whether the agent is active.
    async fn agent_is_active(&self, agent_id: AgentId) -> Result<bool, PointsError> {
        self.store
            .fetch_agent(agent_id)
            .await?
            .map(|agent| agent.is_active)
            .ok_or(PointsError::AgentNotFound(agent_id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PointsError {
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error("requested {requested} points but only {available} are available")]
    InsufficientPoints {
        requested: Decimal,
        available: Decimal,
    },
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),
    #[error("agent {0} is inactive")]
    AgentInactive(AgentId),
    #[error("redemption {0} not found")]
    RedemptionNotFound(RedemptionId),
    #[error("redemption {id} was already {}", .status.label())]
    AlreadyProcessed {
        id: RedemptionId,
        status: RedemptionStatus,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
