use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::db::position_repo::NewPosition;
use crate::models::{Direction, MetalType, SubscriptionTier};

/// Raw position fields as submitted by a client.
#[derive(Debug, Clone)]
pub struct PositionInput {
    pub metal: String,
    pub direction: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub contract_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
}

/// Reason a position cannot be opened or modified.
#[derive(Debug, Error, PartialEq)]
pub enum PositionViolation {
    #[error("unknown metal type: {0}")]
    UnknownMetal(String),

    #[error("direction must be 'long' or 'short', got '{0}'")]
    InvalidDirection(String),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("expiry date {expiry} is before contract date {contract}")]
    ExpiryBeforeContract { contract: NaiveDate, expiry: NaiveDate },

    #[error("entry price {entry} is {deviation_pct}% from market price {market} (max {max_pct}%)")]
    OutsidePriceBand {
        entry: Decimal,
        market: Decimal,
        deviation_pct: Decimal,
        max_pct: Decimal,
    },

    #[error("position limit reached for {tier} plan: {current}/{max} active positions")]
    TooManyPositions {
        tier: SubscriptionTier,
        current: i64,
        max: i64,
    },
}

/// Field-level checks that need no market or account context.
pub fn validate_input(input: &PositionInput) -> Result<NewPosition, PositionViolation> {
    let metal = MetalType::from_api_str(&input.metal)
        .ok_or_else(|| PositionViolation::UnknownMetal(input.metal.clone()))?;
    let direction = Direction::from_api_str(&input.direction)
        .ok_or_else(|| PositionViolation::InvalidDirection(input.direction.clone()))?;

    require_positive("quantity", input.quantity)?;
    require_positive("entry_price", input.entry_price)?;
    validate_levels(input.target_price, input.stop_loss)?;

    if input.expiry_date < input.contract_date {
        return Err(PositionViolation::ExpiryBeforeContract {
            contract: input.contract_date,
            expiry: input.expiry_date,
        });
    }

    Ok(NewPosition {
        metal,
        direction,
        quantity: input.quantity,
        entry_price: input.entry_price,
        target_price: input.target_price,
        stop_loss: input.stop_loss,
        contract_date: input.contract_date,
        expiry_date: input.expiry_date,
        notes: input.notes.clone().filter(|n| !n.trim().is_empty()),
    })
}

/// Optional target and stop levels must be positive when present.
pub fn validate_levels(
    target_price: Option<Decimal>,
    stop_loss: Option<Decimal>,
) -> Result<(), PositionViolation> {
    if let Some(target) = target_price {
        require_positive("target_price", target)?;
    }
    if let Some(stop) = stop_loss {
        require_positive("stop_loss", stop)?;
    }
    Ok(())
}

pub fn require_positive(field: &'static str, value: Decimal) -> Result<(), PositionViolation> {
    if value <= Decimal::ZERO {
        return Err(PositionViolation::NotPositive { field });
    }
    Ok(())
}

/// Entry price must be within `max_pct` percent of the market price.
/// A deviation of exactly `max_pct` is accepted.
pub fn check_price_band(
    entry: Decimal,
    market: Decimal,
    max_pct: Decimal,
) -> Result<(), PositionViolation> {
    if market.is_zero() {
        return Ok(());
    }
    let deviation_pct = ((entry - market) / market).abs() * Decimal::ONE_HUNDRED;
    if deviation_pct > max_pct {
        return Err(PositionViolation::OutsidePriceBand {
            entry,
            market,
            deviation_pct: deviation_pct.round_dp(2),
            max_pct,
        });
    }
    Ok(())
}

/// A tier may hold at most `position_limit()` active positions.
pub fn check_position_limit(
    tier: SubscriptionTier,
    active_positions: i64,
) -> Result<(), PositionViolation> {
    let max = tier.position_limit();
    if active_positions >= max {
        return Err(PositionViolation::TooManyPositions {
            tier,
            current: active_positions,
            max,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn input() -> PositionInput {
        PositionInput {
            metal: "copper".into(),
            direction: "long".into(),
            quantity: Decimal::from(10),
            entry_price: Decimal::from(8_500),
            target_price: Some(Decimal::from(9_000)),
            stop_loss: Some(Decimal::from(8_000)),
            contract_date: date(2024, 1, 1),
            expiry_date: date(2024, 6, 30),
            notes: Some("  ".into()),
        }
    }

    #[test]
    fn test_valid_input_passes() {
        let new = validate_input(&input()).unwrap();
        assert_eq!(new.metal, MetalType::Copper);
        assert_eq!(new.direction, Direction::Long);
        assert!(new.notes.is_none());
    }

    #[test]
    fn test_unknown_direction() {
        let mut i = input();
        i.direction = "flat".into();
        assert_eq!(
            validate_input(&i),
            Err(PositionViolation::InvalidDirection("flat".into()))
        );
    }

    #[test]
    fn test_unknown_metal() {
        let mut i = input();
        i.metal = "gold".into();
        assert!(matches!(validate_input(&i), Err(PositionViolation::UnknownMetal(_))));
    }

    #[test]
    fn test_non_positive_quantity_and_price() {
        let mut i = input();
        i.quantity = Decimal::ZERO;
        assert_eq!(
            validate_input(&i),
            Err(PositionViolation::NotPositive { field: "quantity" })
        );

        let mut i = input();
        i.entry_price = Decimal::from(-1);
        assert_eq!(
            validate_input(&i),
            Err(PositionViolation::NotPositive { field: "entry_price" })
        );

        let mut i = input();
        i.stop_loss = Some(Decimal::ZERO);
        assert_eq!(
            validate_input(&i),
            Err(PositionViolation::NotPositive { field: "stop_loss" })
        );
    }

    #[test]
    fn test_expiry_before_contract() {
        let mut i = input();
        i.expiry_date = date(2023, 12, 31);
        assert!(matches!(
            validate_input(&i),
            Err(PositionViolation::ExpiryBeforeContract { .. })
        ));

        // Same-day expiry is allowed
        let mut i = input();
        i.expiry_date = i.contract_date;
        assert!(validate_input(&i).is_ok());
    }

    #[test]
    fn test_price_band() {
        let market = Decimal::from(100);
        let band = Decimal::from(10);
        assert!(check_price_band(Decimal::from(110), market, band).is_ok());
        assert!(check_price_band(Decimal::from(90), market, band).is_ok());
        assert!(matches!(
            check_price_band(Decimal::new(1101, 1), market, band),
            Err(PositionViolation::OutsidePriceBand { .. })
        ));
        assert!(matches!(
            check_price_band(Decimal::from(85), market, band),
            Err(PositionViolation::OutsidePriceBand { .. })
        ));
    }

    #[test]
    fn test_position_limits_per_tier() {
        assert!(check_position_limit(SubscriptionTier::Basic, 4).is_ok());
        assert!(matches!(
            check_position_limit(SubscriptionTier::Basic, 5),
            Err(PositionViolation::TooManyPositions { max: 5, .. })
        ));
        assert!(check_position_limit(SubscriptionTier::Pro, 24).is_ok());
        assert!(check_position_limit(SubscriptionTier::Pro, 25).is_err());
        assert!(check_position_limit(SubscriptionTier::Enterprise, 999).is_ok());
        assert!(check_position_limit(SubscriptionTier::Enterprise, 1000).is_err());
    }
}
