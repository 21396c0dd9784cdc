use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Direction, MetalType, Position};

use super::pnl::compute_pnl;

/// VaR is a fixed share of gross exposure, not a statistical model.
pub const VAR_EXPOSURE_FRACTION: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

const HIGH_CONCENTRATION_PCT: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
const MEDIUM_CONCENTRATION_PCT: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// `high` above 50%, `medium` from 30% up to 50%, otherwise `low`.
    pub fn from_concentration(concentration_pct: Decimal) -> Self {
        if concentration_pct > HIGH_CONCENTRATION_PCT {
            RiskLevel::High
        } else if concentration_pct >= MEDIUM_CONCENTRATION_PCT {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Derived portfolio risk figures. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSnapshot {
    pub total_exposure: Decimal,
    pub total_unrealized_pnl: Decimal,
    pub metal_exposure: BTreeMap<MetalType, Decimal>,
    pub concentration_risk: Decimal,
    pub long_exposure: Decimal,
    pub short_exposure: Decimal,
    pub positions_at_risk: usize,
    pub value_at_risk: Decimal,
    pub portfolio_beta: Decimal,
    pub risk_level: RiskLevel,
}

/// True when the price has crossed the position's stop-loss.
pub fn stop_loss_breached(direction: Direction, stop_loss: Option<Decimal>, price: Decimal) -> bool {
    match (direction, stop_loss) {
        (Direction::Long, Some(stop)) => price <= stop,
        (Direction::Short, Some(stop)) => price >= stop,
        (_, None) => false,
    }
}

/// Reduce a user's active positions into a [`RiskSnapshot`].
///
/// `prices` holds the latest price per metal; a metal without a price is
/// marked at the position's entry price. `volatility` holds the trailing
/// average absolute percent change per metal (missing metals count as zero).
/// Non-active positions in the input are ignored.
pub fn compute_risk(
    positions: &[Position],
    prices: &HashMap<MetalType, Decimal>,
    volatility: &HashMap<MetalType, Decimal>,
) -> RiskSnapshot {
    let mut total_exposure = Decimal::ZERO;
    let mut total_unrealized_pnl = Decimal::ZERO;
    let mut long_exposure = Decimal::ZERO;
    let mut short_exposure = Decimal::ZERO;
    let mut positions_at_risk = 0usize;
    let mut metal_exposure: BTreeMap<MetalType, Decimal> = BTreeMap::new();

    for pos in positions.iter().filter(|p| p.is_active()) {
        let exposure = pos.exposure();
        let price = prices.get(&pos.metal).copied().unwrap_or(pos.entry_price);

        total_exposure += exposure;
        total_unrealized_pnl +=
            compute_pnl(pos.direction, pos.quantity, pos.entry_price, price).amount;
        *metal_exposure.entry(pos.metal).or_insert(Decimal::ZERO) += exposure;

        match pos.direction {
            Direction::Long => long_exposure += exposure,
            Direction::Short => short_exposure += exposure,
        }

        if stop_loss_breached(pos.direction, pos.stop_loss, price) {
            positions_at_risk += 1;
        }
    }

    let concentration_risk = concentration(&metal_exposure, total_exposure);
    let portfolio_beta = portfolio_beta(&metal_exposure, total_exposure, volatility);

    RiskSnapshot {
        total_exposure,
        total_unrealized_pnl,
        metal_exposure,
        concentration_risk,
        long_exposure,
        short_exposure,
        positions_at_risk,
        value_at_risk: total_exposure * VAR_EXPOSURE_FRACTION,
        portfolio_beta,
        risk_level: RiskLevel::from_concentration(concentration_risk),
    }
}

/// Largest single-metal exposure as a percentage of the total.
pub fn concentration(metal_exposure: &BTreeMap<MetalType, Decimal>, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    let max = metal_exposure.values().copied().max().unwrap_or(Decimal::ZERO);
    max / total * Decimal::ONE_HUNDRED
}

/// Exposure-weighted trailing volatility: Σ weight × (avg |Δ%| / 100).
pub fn portfolio_beta(
    metal_exposure: &BTreeMap<MetalType, Decimal>,
    total: Decimal,
    volatility: &HashMap<MetalType, Decimal>,
) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    metal_exposure
        .iter()
        .map(|(metal, exposure)| {
            let weight = *exposure / total;
            let vol = volatility.get(metal).copied().unwrap_or(Decimal::ZERO);
            weight * (vol / Decimal::ONE_HUNDRED)
        })
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
