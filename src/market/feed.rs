use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::db::market_repo;
use crate::models::{MarketTick, MetalType};

use super::simulator::seed_tick;
use super::{PriceCache, PriceSnapshot, PriceSource};

/// Outcome of a feed read.
#[derive(Debug, Clone)]
pub enum Refresh {
    /// Served from the cache; no ticks were generated.
    Cached(Arc<PriceSnapshot>),
    /// The cache had expired and a new round of ticks was generated and stored.
    Ticked {
        snapshot: Arc<PriceSnapshot>,
        ticks: Vec<MarketTick>,
    },
}

/// Market price feed: a primary [`PriceSource`], an optional explicit
/// fallback source, and an injected [`PriceCache`].
///
/// Refresh is lazy. The first reader after the TTL expires generates ticks
/// under `refresh_lock`; readers queued behind it re-check the cache and get
/// the snapshot it stored.
pub struct MarketFeed {
    primary: Box<dyn PriceSource>,
    fallback: Option<Box<dyn PriceSource>>,
    cache: PriceCache,
    refresh_lock: Mutex<()>,
    freshness: Duration,
}

impl MarketFeed {
    pub fn new(primary: Box<dyn PriceSource>, cache: PriceCache, freshness: Duration) -> Self {
        Self {
            primary,
            fallback: None,
            cache,
            refresh_lock: Mutex::new(()),
            freshness,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn PriceSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn source_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Current snapshot, refreshing it if the cache TTL has passed.
    pub async fn snapshot(&self, pool: &PgPool) -> anyhow::Result<Refresh> {
        if let Some(snapshot) = self.cache.get().await {
            counter!("price_cache_hits_total").increment(1);
            return Ok(Refresh::Cached(snapshot));
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(snapshot) = self.cache.get().await {
            counter!("price_cache_hits_total").increment(1);
            return Ok(Refresh::Cached(snapshot));
        }
        counter!("price_cache_misses_total").increment(1);

        let mut previous = self.previous_snapshot(pool).await?;
        let ticks = self.generate(&previous).await?;

        market_repo::insert_ticks(pool, &ticks).await?;
        counter!("market_ticks_total").increment(ticks.len() as u64);

        for t in &ticks {
            previous.insert(t.metal, t.clone());
        }
        let snapshot = self.cache.store(previous).await;

        tracing::debug!(
            source = self.primary.name(),
            ticks = ticks.len(),
            "Market feed refreshed"
        );

        Ok(Refresh::Ticked { snapshot, ticks })
    }

    /// Latest price per metal within the freshness window.
    ///
    /// Metals with no tick inside the window are absent; callers fall back to
    /// their own last-known price (see [`price_or`]).
    pub async fn latest_prices(&self, pool: &PgPool) -> anyhow::Result<HashMap<MetalType, Decimal>> {
        let since = Utc::now() - self.freshness;
        let ticks = market_repo::latest_ticks_since(pool, since).await?;
        Ok(ticks.into_iter().map(|t| (t.metal, t.price)).collect())
    }

    /// Latest price for one metal within the freshness window, else `fallback`.
    pub async fn current_price(
        &self,
        pool: &PgPool,
        metal: MetalType,
        fallback: Decimal,
    ) -> anyhow::Result<Decimal> {
        let since = Utc::now() - self.freshness;
        let tick = market_repo::latest_tick_since(pool, metal, since).await?;
        Ok(tick.map(|t| t.price).unwrap_or(fallback))
    }

    /// Previous values for the walk: cached snapshot, else newest stored tick
    /// per metal, else base price.
    async fn previous_snapshot(&self, pool: &PgPool) -> anyhow::Result<PriceSnapshot> {
        let mut previous: PriceSnapshot = match self.cache.last_known().await {
            Some(snapshot) => (*snapshot).clone(),
            None => market_repo::latest_ticks(pool)
                .await?
                .into_iter()
                .map(|t| (t.metal, t))
                .collect(),
        };

        let now = Utc::now();
        for metal in MetalType::ALL {
            previous.entry(metal).or_insert_with(|| seed_tick(metal, now));
        }
        Ok(previous)
    }

    async fn generate(&self, previous: &PriceSnapshot) -> anyhow::Result<Vec<MarketTick>> {
        match self.primary.next_ticks(previous).await {
            Ok(ticks) => Ok(ticks),
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!(
                        error = %e,
                        primary = self.primary.name(),
                        fallback = fallback.name(),
                        "Primary price source failed, using fallback"
                    );
                    fallback.next_ticks(previous).await
                }
                None => Err(e),
            },
        }
    }
}

/// Price for `metal` from a price map, or `fallback` when absent.
pub fn price_or(prices: &HashMap<MetalType, Decimal>, metal: MetalType, fallback: Decimal) -> Decimal {
    prices.get(&metal).copied().unwrap_or(fallback)
}
