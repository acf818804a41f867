use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::domain::{LedgerTotals, PointsBalance, VoucherOption};
use crate::config::RewardsConfig;

pub const CASH_REDEMPTION: &str = "cash";
const MONEY_PLACES: u32 = 2;

/// Banker's rounding to cents. Only applied to money, never to points.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_PLACES, RoundingStrategy::MidpointNearestEven)
}

/// Earned minus every reserved or completed redemption, floored at zero.
pub fn available_points(totals: &LedgerTotals) -> Decimal {
    totals
        .earned
        .saturating_sub(totals.completed)
        .saturating_sub(totals.pending)
        .max(Decimal::ZERO)
}

/// Smallest multiple of `step` that is at least `available`.
pub fn next_threshold(available: Decimal, step: Decimal) -> Decimal {
    if step <= Decimal::ZERO {
        return available;
    }
    available
        .checked_div(step)
        .and_then(|steps| steps.ceil().checked_mul(step))
        .unwrap_or(available)
}

pub fn default_vouchers() -> Vec<VoucherOption> {
    vec![
        VoucherOption {
            code: "amazon".to_string(),
            name: "Amazon gift card".to_string(),
            rate: dec!(0.01),
            minimum_points: dec!(50),
            max_value: Some(dec!(100)),
        },
        VoucherOption {
            code: "hotel-credit".to_string(),
            name: "Partner hotel credit".to_string(),
            rate: dec!(0.012),
            minimum_points: dec!(100),
            max_value: Some(dec!(250)),
        },
        VoucherOption {
            code: "dining".to_string(),
            name: "Dining voucher".to_string(),
            rate: dec!(0.008),
            minimum_points: dec!(25),
            max_value: Some(dec!(50)),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionQuote {
    pub redemption_type: String,
    pub points: Decimal,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("at least {minimum} points must be redeemed")]
    BelowMinimum { minimum: Decimal },
    #[error("unknown voucher option '{0}'")]
    UnknownVoucher(String),
    #[error("voucher '{code}' requires at least {minimum} points")]
    BelowVoucherMinimum { code: String, minimum: Decimal },
    #[error("{points} points is too large to price")]
    TooLarge { points: Decimal },
}

/// Conversion rules for turning points into money.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionPolicy {
    pub minimum_redemption: Decimal,
    pub point_value: Decimal,
    pub threshold_step: Decimal,
    pub vouchers: Vec<VoucherOption>,
}

impl Default for RedemptionPolicy {
    fn default() -> Self {
        Self::from_config(&RewardsConfig::default())
    }
}

impl RedemptionPolicy {
    pub fn from_config(config: &RewardsConfig) -> Self {
        Self {
            minimum_redemption: config.minimum_redemption,
            point_value: config.point_value,
            threshold_step: config.threshold_step,
            vouchers: default_vouchers(),
        }
    }

    pub fn balance(&self, totals: &LedgerTotals) -> PointsBalance {
        let available = available_points(totals);
        PointsBalance {
            total_earned: totals.earned,
            total_redeemed: totals.completed,
            pending_redemptions: totals.pending,
            available_points: available,
            can_redeem: available >= self.minimum_redemption,
            next_threshold: next_threshold(available, self.threshold_step),
        }
    }

    /// Prices a redemption without looking at any balance. Cash uses the configured
    /// point value; vouchers use their own rate capped at `max_value`.
    pub fn quote(&self, points: Decimal, voucher_code: Option<&str>) -> Result<RedemptionQuote, QuoteError> {
        if points <= Decimal::ZERO || points < self.minimum_redemption {
            return Err(QuoteError::BelowMinimum {
                minimum: self.minimum_redemption,
            });
        }

        let code = voucher_code.map(str::trim).filter(|code| !code.is_empty());
        let Some(code) = code.filter(|code| *code != CASH_REDEMPTION) else {
            return Ok(RedemptionQuote {
                redemption_type: CASH_REDEMPTION.to_string(),
                points,
                value: round_money(
                    points
                        .checked_mul(self.point_value)
                        .ok_or(QuoteError::TooLarge { points })?,
                ),
            });
        };

        let voucher = self
            .vouchers
            .iter()
            .find(|voucher| voucher.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| QuoteError::UnknownVoucher(code.to_string()))?;
        if points < voucher.minimum_points {
            return Err(QuoteError::BelowVoucherMinimum {
                code: voucher.code.clone(),
                minimum: voucher.minimum_points,
            });
        }

        let raw = points
            .checked_mul(voucher.rate)
            .ok_or(QuoteError::TooLarge { points })?;
        let value = match voucher.max_value {
            Some(cap) => raw.min(cap),
            None => raw,
        };
        Ok(RedemptionQuote {
            redemption_type: voucher.code.clone(),
            points,
            value: round_money(value),
        })
    }
}
