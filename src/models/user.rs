use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

use super::UnknownVariant;

/// Database row for users table.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub company: Option<String>,
    #[sqlx(try_from = "String")]
    pub subscription_tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user, without credentials.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub company: Option<String>,
    pub subscription_tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            full_name: u.full_name,
            company: u.company,
            subscription_tier: u.subscription_tier,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Basic,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Some(SubscriptionTier::Basic),
            "pro" => Some(SubscriptionTier::Pro),
            "enterprise" => Some(SubscriptionTier::Enterprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    /// Maximum number of simultaneously active positions.
    pub fn position_limit(&self) -> i64 {
        match self {
            SubscriptionTier::Basic => 5,
            SubscriptionTier::Pro => 25,
            SubscriptionTier::Enterprise => 1000,
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SubscriptionTier {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SubscriptionTier::from_api_str(&value).ok_or(UnknownVariant {
            kind: "subscription tier",
            value,
        })
    }
}
