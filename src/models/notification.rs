use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row for notifications table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification kind constants.
pub mod notification_kind {
    pub const ALERT_TRIGGERED: &str = "alert_triggered";
    pub const POSITION_CLOSED: &str = "position_closed";
    pub const POSITION_EXPIRED: &str = "position_expired";
}
