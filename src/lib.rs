pub mod analytics;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod market;
pub mod metrics;
pub mod models;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;
use crate::config::AppConfig;
use crate::market::{FeedMode, LiveSource, MarketFeed, PriceCache, SimulatedSource};
use crate::services::notifier::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: AppConfig,
    pub feed: Arc<MarketFeed>,
    pub ws_tx: broadcast::Sender<WsMessage>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
    pub notifier: Option<Arc<Notifier>>,
}

impl AppState {
    /// Wire the market feed and optional notifier from configuration.
    pub fn new(db: sqlx::PgPool, config: AppConfig) -> Self {
        let feed = Arc::new(build_feed(&config));

        let notifier = if config.has_telegram() {
            match (&config.telegram_bot_token, &config.telegram_chat_id) {
                (Some(token), Some(chat)) => {
                    Some(Arc::new(Notifier::new(token.clone(), chat.clone())))
                }
                _ => None,
            }
        } else {
            None
        };

        let (ws_tx, _) = broadcast::channel::<WsMessage>(256);

        Self {
            db,
            config,
            feed,
            ws_tx,
            metrics_handle: crate::metrics::init_metrics(),
            notifier,
        }
    }
}

/// Simulated by default. Live mode keeps the simulator as an explicit fallback.
pub fn build_feed(config: &AppConfig) -> MarketFeed {
    let cache = PriceCache::new(Duration::from_secs(config.price_cache_ttl_secs));
    let freshness = chrono::Duration::minutes(config.price_freshness_minutes);
    let simulated = Box::new(SimulatedSource::new(config.feed_seed));

    match (config.market_feed_mode, &config.live_feed_url) {
        (FeedMode::Live, Some(url)) => {
            tracing::info!(url = %url, "Market feed: live source with simulated fallback");
            let live = LiveSource::new(reqwest::Client::new(), url.clone());
            MarketFeed::new(Box::new(live), cache, freshness).with_fallback(simulated)
        }
        (FeedMode::Live, None) => {
            tracing::warn!("MARKET_FEED_MODE=live but LIVE_FEED_URL is empty, using simulated feed");
            MarketFeed::new(simulated, cache, freshness)
        }
        (FeedMode::Simulated, _) => {
            tracing::info!(seed = ?config.feed_seed, "Market feed: simulated source");
            MarketFeed::new(simulated, cache, freshness)
        }
    }
}
