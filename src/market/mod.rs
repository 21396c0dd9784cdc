pub mod cache;
pub mod feed;
pub mod live;
pub mod simulator;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::{MarketTick, MetalType};

pub use cache::PriceCache;
pub use feed::{MarketFeed, Refresh};
pub use live::LiveSource;
pub use simulator::SimulatedSource;

/// Latest tick per metal.
pub type PriceSnapshot = HashMap<MetalType, MarketTick>;

/// A strategy that produces the next round of ticks.
///
/// `previous` always holds one tick per metal (the last known value, or the
/// seed tick at base price).
#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn next_ticks(&self, previous: &PriceSnapshot) -> anyhow::Result<Vec<MarketTick>>;
}

/// Feed strategy selected by `MARKET_FEED_MODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Simulated,
    Live,
}

impl FeedMode {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "live" => FeedMode::Live,
            _ => FeedMode::Simulated,
        }
    }
}

impl std::fmt::Display for FeedMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedMode::Simulated => write!(f, "simulated"),
            FeedMode::Live => write!(f, "live"),
        }
    }
}
