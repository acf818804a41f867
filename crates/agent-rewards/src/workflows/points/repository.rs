use async_trait::async_trait;

use super::domain::{LedgerTotals, Redemption, RedemptionSettlement, ReserveOutcome};
use crate::ids::{AgentId, RedemptionId};
use crate::repository::RepositoryError;

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn ledger_totals(&self, agent_id: AgentId) -> Result<LedgerTotals, RepositoryError>;
    /// Re-reads the agent's available points and inserts the pending redemption as one
    /// atomic step, so concurrent requests cannot both spend the same points.
    async fn reserve_redemption(&self, redemption: Redemption) -> Result<ReserveOutcome, RepositoryError>;
    async fn fetch_redemption(&self, id: RedemptionId) -> Result<Option<Redemption>, RepositoryError>;
    /// Newest first.
    async fn list_redemptions(&self, agent_id: AgentId) -> Result<Vec<Redemption>, RepositoryError>;
    /// Compare-and-set from `pending`: `Conflict` when already settled.
    async fn settle_redemption(
        &self,
        id: RedemptionId,
        settlement: RedemptionSettlement,
    ) -> Result<Redemption, RepositoryError>;
}
