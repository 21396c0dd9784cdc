use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Direction, Position};

/// Profit/loss of a position at a given price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PnL {
    pub amount: Decimal,
    pub percent: Decimal,
}

impl PnL {
    pub const ZERO: PnL = PnL {
        amount: Decimal::ZERO,
        percent: Decimal::ZERO,
    };
}

/// Compute P&L for `quantity` units entered at `entry_price`, marked at
/// `current_price`.
///
/// long:  amount = qty × current − qty × entry
/// short: amount = qty × entry − qty × current
/// percent = amount / (qty × entry) × 100
///
/// A zero entry value yields a zero percent. Position creation rejects
/// non-positive quantity and entry price, so stored positions never hit it.
pub fn compute_pnl(
    direction: Direction,
    quantity: Decimal,
    entry_price: Decimal,
    current_price: Decimal,
) -> PnL {
    let entry_value = quantity * entry_price;
    let current_value = quantity * current_price;

    let amount = match direction {
        Direction::Long => current_value - entry_value,
        Direction::Short => entry_value - current_value,
    };

    let percent = if entry_value.is_zero() {
        Decimal::ZERO
    } else {
        amount / entry_value * Decimal::ONE_HUNDRED
    };

    PnL { amount, percent }
}

/// P&L for a stored position.
///
/// Active positions are marked at `current_price`. Closed positions return the
/// persisted `profit_loss`; nothing is recomputed after close.
pub fn position_pnl(position: &Position, current_price: Decimal) -> PnL {
    match (position.profit_loss, position.close_price) {
        (Some(realized), Some(close_price)) => {
            let at_close = compute_pnl(
                position.direction,
                position.quantity,
                position.entry_price,
                close_price,
            );
            PnL {
                amount: realized,
                percent: at_close.percent,
            }
        }
        _ => compute_pnl(
            position.direction,
            position.quantity,
            position.entry_price,
            current_price,
        ),
    }
}

/// Whole days from `today` until `expiry`; negative once expired.
pub fn days_to_expiry(expiry: NaiveDate, today: NaiveDate) -> i64 {
    (expiry - today).num_days()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
