use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{AgentId, RedemptionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
    Pending,
    Completed,
    Rejected,
}

impl RedemptionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RedemptionStatus::Pending => "pending",
            RedemptionStatus::Completed => "completed",
            RedemptionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Redemption {
    pub id: RedemptionId,
    pub agent_id: AgentId,
    pub points_used: Decimal,
    /// `cash` or the voucher option code.
    pub redemption_type: String,
    pub redemption_value: Decimal,
    pub status: RedemptionStatus,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<Uuid>,
    pub notes: Option<String>,
}

/// Settlement applied with compare-and-set from `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionSettlement {
    pub status: RedemptionStatus,
    pub processed_at: DateTime<Utc>,
    pub processed_by: Uuid,
    pub notes: Option<String>,
}

/// Named voucher with its own conversion rate, entry threshold and payout cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherOption {
    pub code: String,
    pub name: String,
    pub rate: Decimal,
    pub minimum_points: Decimal,
    pub max_value: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionRequest {
    pub points: Decimal,
    #[serde(default)]
    pub voucher_code: Option<String>,
}

/// Raw per-agent sums the balance is derived from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerTotals {
    /// Reward points of approved bookings.
    pub earned: Decimal,
    pub completed: Decimal,
    pub pending: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBalance {
    pub total_earned: Decimal,
    pub total_redeemed: Decimal,
    pub pending_redemptions: Decimal,
    pub available_points: Decimal,
    pub can_redeem: bool,
    pub next_threshold: Decimal,
}

/// Result of the atomic balance check and insert.
#[derive(Debug, Clone, PartialEq)]
pub enum ReserveOutcome {
    Reserved(Redemption),
    Insufficient { available: Decimal },
}
