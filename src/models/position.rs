use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Direction, MetalType};

/// Database row for positions table.
///
/// Unrealized P&L is never stored here; it is recomputed from the current
/// price on every read (see [`PositionView`]).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Position {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub metal: MetalType,
    #[sqlx(try_from = "String")]
    pub direction: Direction,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub status: String,
    pub contract_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub close_price: Option<Decimal>,
    pub profit_loss: Option<Decimal>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn is_active(&self) -> bool {
        self.status == position_status::ACTIVE
    }

    /// quantity × entry price.
    pub fn exposure(&self) -> Decimal {
        self.quantity * self.entry_price
    }
}

/// Position status constants.
pub mod position_status {
    pub const ACTIVE: &str = "active";
    pub const CLOSED: &str = "closed";
    pub const EXPIRED: &str = "expired";

    pub fn is_valid(s: &str) -> bool {
        matches!(s, ACTIVE | CLOSED | EXPIRED)
    }
}

/// A position enriched with market data for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct PositionView {
    #[serde(flatten)]
    pub position: Position,
    pub current_price: Decimal,
    pub pnl: Decimal,
    pub pnl_percent: Decimal,
    pub days_to_expiry: i64,
}
