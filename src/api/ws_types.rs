use serde::Serialize;
use uuid::Uuid;

use crate::models::{MarketTick, Position, TradingAlert};

/// Messages broadcast to connected WebSocket clients.
///
/// Price updates go to every client. Position and alert messages belong to
/// one user and are only delivered to that user's authenticated sockets.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    #[serde(rename = "price_update")]
    PriceUpdate(Vec<MarketTick>),

    #[serde(rename = "alert_triggered")]
    AlertTriggered(TradingAlert),

    #[serde(rename = "position_update")]
    PositionUpdate(Position),
}

impl WsMessage {
    /// User the message belongs to; `None` for public market data.
    pub fn owner(&self) -> Option<Uuid> {
        match self {
            WsMessage::PriceUpdate(_) => None,
            WsMessage::AlertTriggered(alert) => Some(alert.user_id),
            WsMessage::PositionUpdate(position) => Some(position.user_id),
        }
    }

    /// Whether a socket authenticated as `viewer` (or anonymous) may see it.
    pub fn visible_to(&self, viewer: Option<Uuid>) -> bool {
        match self.owner() {
            None => true,
            Some(owner) => viewer == Some(owner),
        }
    }
}
