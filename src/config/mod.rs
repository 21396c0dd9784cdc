use std::env;

use rust_decimal::Decimal;

use crate::market::FeedMode;

const DEV_JWT_SECRET: &str = "metalhedge-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Auth
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,

    // Market feed
    pub market_feed_mode: FeedMode,
    pub live_feed_url: Option<String>,
    pub price_cache_ttl_secs: u64,
    pub price_freshness_minutes: i64,
    pub feed_seed: Option<u64>,

    // Position rules
    pub price_band_pct: Decimal,

    // Notifications (optional: Telegram push on top of stored notifications)
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub notifications_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!("JWT_SECRET not set: using development secret");
                DEV_JWT_SECRET.into()
            }
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,

            jwt_secret,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".into())
                .parse()
                .unwrap_or(24),

            market_feed_mode: FeedMode::from_str(
                &env::var("MARKET_FEED_MODE").unwrap_or_else(|_| "simulated".into()),
            ),
            live_feed_url: env::var("LIVE_FEED_URL").ok().filter(|s| !s.is_empty()),
            price_cache_ttl_secs: env::var("PRICE_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
            price_freshness_minutes: env::var("PRICE_FRESHNESS_MINUTES")
                .unwrap_or_else(|_| "120".into())
                .parse()
                .unwrap_or(120),
            feed_seed: env::var("FEED_SEED").ok().and_then(|s| s.parse().ok()),

            price_band_pct: env::var("PRICE_BAND_PCT")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(Decimal::from(10)),

            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok(),
            notifications_enabled: env::var("NOTIFICATIONS_ENABLED")
                .unwrap_or_else(|_| "false".into())
                .parse()
                .unwrap_or(false),
        })
    }

    /// Defaults for everything except the database URL.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".into(),
            port: 8080,
            jwt_secret: DEV_JWT_SECRET.into(),
            jwt_expiry_hours: 24,
            market_feed_mode: FeedMode::Simulated,
            live_feed_url: None,
            price_cache_ttl_secs: 30,
            price_freshness_minutes: 120,
            feed_seed: None,
            price_band_pct: Decimal::from(10),
            telegram_bot_token: None,
            telegram_chat_id: None,
            notifications_enabled: false,
        }
    }

    /// Returns true if Telegram push notifications can be sent.
    pub fn has_telegram(&self) -> bool {
        self.notifications_enabled
            && self.telegram_bot_token.is_some()
            && self.telegram_chat_id.is_some()
    }
}
