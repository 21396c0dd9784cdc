use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::models::{MarketTick, Position, TradingAlert};

/// Telegram push to a single operator chat (`TELEGRAM_CHAT_ID`). Every user's
/// events land in the same chat, so each message names the user it concerns.
/// Failures are logged but never block the main flow.
#[derive(Debug, Clone)]
pub struct Notifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl Notifier {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token,
            chat_id,
        }
    }

    /// Send a Telegram message. Failures are logged as warnings.
    pub async fn send(&self, message: &str) {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let body = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "Markdown",
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(resp) => {
                if !resp.status().is_success() {
                    tracing::warn!(
                        status = %resp.status(),
                        "Telegram sendMessage returned non-2xx"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to send Telegram notification");
            }
        }
    }
}

/// Title and body for a triggered alert.
pub fn format_alert_triggered(alert: &TradingAlert, tick: &MarketTick) -> (String, String) {
    let title = format!("{} alert triggered", alert.metal);
    let body = match alert.kind {
        crate::models::AlertKind::VolumeSpike => format!(
            "{} volume {} reached your target of {}",
            alert.metal,
            tick.volume.round_dp(2),
            alert.target_value,
        ),
        _ => format!(
            "{} {} at {} (target {}, {}%)",
            alert.metal,
            if tick.price >= alert.target_value { "rose to" } else { "fell to" },
            tick.price.round_dp(2),
            alert.target_value,
            tick.change_percent.round_dp(2),
        ),
    };
    (title, body)
}

/// Title and body for a closed position.
pub fn format_position_closed(position: &Position, close_price: Decimal, pnl: Decimal) -> (String, String) {
    let title = format!("{} position closed", position.metal);
    let body = format!(
        "{} {} {} @ {} closed at {}\nP&L: {}",
        position.direction,
        position.quantity,
        position.metal,
        position.entry_price,
        close_price.round_dp(2),
        pnl.round_dp(2),
    );
    (title, body)
}

/// Operator-chat text for a stored notification, tagged with its owner.
pub fn format_push(user_id: Uuid, title: &str, body: &str) -> String {
    format!("*{title}*\nuser `{user_id}`\n{body}")
}
