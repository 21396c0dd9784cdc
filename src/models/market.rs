use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::MetalType;

/// One price observation for a metal. Rows in market_data are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MarketTick {
    #[sqlx(try_from = "String")]
    pub metal: MetalType,
    pub price: Decimal,
    pub change_24h: Decimal,
    pub change_percent: Decimal,
    pub volume: Decimal,
    pub market_cap: Decimal,
    pub recorded_at: DateTime<Utc>,
}
