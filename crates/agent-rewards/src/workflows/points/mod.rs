//! Points ledger and redemption engine.
//!
//! An agent's balance is derived on demand: reward points of approved bookings minus
//! every pending or completed redemption. Redemptions reserve points atomically at
//! creation; rejecting one releases them.

pub mod domain;
pub mod ledger;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    LedgerTotals, PointsBalance, Redemption, RedemptionRequest, RedemptionSettlement,
    RedemptionStatus, ReserveOutcome, VoucherOption,
};
pub use ledger::{round_money, QuoteError, RedemptionPolicy, RedemptionQuote, CASH_REDEMPTION};
pub use repository::LedgerRepository;
pub use router::points_router;
pub use service::{PointsError, PointsService};
