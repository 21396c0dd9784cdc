use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use super::{MetalType, UnknownVariant};

/// Database row for trading_alerts table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TradingAlert {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(try_from = "String")]
    pub metal: MetalType,
    #[sqlx(try_from = "String")]
    pub kind: AlertKind,
    pub target_value: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub triggered_at: Option<DateTime<Utc>>,
}

/// Alert status constants.
pub mod alert_status {
    pub const ACTIVE: &str = "active";
    pub const TRIGGERED: &str = "triggered";
    pub const CANCELLED: &str = "cancelled";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PriceAbove,
    PriceBelow,
    VolumeSpike,
}

impl AlertKind {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "price_above" => Some(AlertKind::PriceAbove),
            "price_below" => Some(AlertKind::PriceBelow),
            "volume_spike" => Some(AlertKind::VolumeSpike),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PriceAbove => "price_above",
            AlertKind::PriceBelow => "price_below",
            AlertKind::VolumeSpike => "volume_spike",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for AlertKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AlertKind::from_api_str(&value).ok_or(UnknownVariant { kind: "alert kind", value })
    }
}
