pub mod alert;
pub mod market;
pub mod notification;
pub mod position;
pub mod user;

pub use alert::{AlertKind, TradingAlert};
pub use market::MarketTick;
pub use notification::Notification;
pub use position::{Position, PositionView};
pub use user::{SubscriptionTier, User, UserProfile};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// ---------------------------------------------------------------------------
// MetalType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetalType {
    Copper,
    Aluminum,
    Zinc,
    Nickel,
    Lead,
    Tin,
}

impl MetalType {
    pub const ALL: [MetalType; 6] = [
        MetalType::Copper,
        MetalType::Aluminum,
        MetalType::Zinc,
        MetalType::Nickel,
        MetalType::Lead,
        MetalType::Tin,
    ];

    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "copper" => Some(MetalType::Copper),
            "aluminum" | "aluminium" => Some(MetalType::Aluminum),
            "zinc" => Some(MetalType::Zinc),
            "nickel" => Some(MetalType::Nickel),
            "lead" => Some(MetalType::Lead),
            "tin" => Some(MetalType::Tin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetalType::Copper => "copper",
            MetalType::Aluminum => "aluminum",
            MetalType::Zinc => "zinc",
            MetalType::Nickel => "nickel",
            MetalType::Lead => "lead",
            MetalType::Tin => "tin",
        }
    }
}

impl fmt::Display for MetalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MetalType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MetalType::from_api_str(&value).ok_or(UnknownVariant { kind: "metal", value })
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "long" => Some(Direction::Long),
            "short" => Some(Direction::Short),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Direction {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Direction::from_api_str(&value).ok_or(UnknownVariant { kind: "direction", value })
    }
}
