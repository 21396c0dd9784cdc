use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::{MarketTick, MetalType};

use super::simulator::MARKET_CAP_MULTIPLIER;
use super::{PriceSnapshot, PriceSource};

/// Quote as returned by the live endpoint, keyed by metal name:
/// `{ "copper": { "price": 8512.5, "volume": 151000 }, ... }`
#[derive(Debug, Deserialize)]
pub struct LiveQuote {
    pub price: Decimal,
    pub volume: Option<Decimal>,
}

/// HTTP JSON price source.
pub struct LiveSource {
    http: reqwest::Client,
    url: String,
}

impl LiveSource {
    pub fn new(http: reqwest::Client, url: String) -> Self {
        Self { http, url }
    }
}

/// Turn raw quotes into ticks relative to `previous`. Unknown metal names and
/// non-positive prices are dropped.
pub fn quotes_to_ticks(
    quotes: HashMap<String, LiveQuote>,
    previous: &PriceSnapshot,
) -> Vec<MarketTick> {
    let now = Utc::now();
    let mut ticks: Vec<MarketTick> = quotes
        .into_iter()
        .filter_map(|(name, quote)| {
            let metal = MetalType::from_api_str(&name)?;
            if quote.price <= Decimal::ZERO {
                tracing::warn!(metal = %metal, price = %quote.price, "Live feed returned non-positive price");
                return None;
            }
            let prev = previous.get(&metal);
            let prev_price = prev.map(|p| p.price).unwrap_or(quote.price);
            let volume = quote
                .volume
                .or_else(|| prev.map(|p| p.volume))
                .unwrap_or(Decimal::ZERO);
            let change = quote.price - prev_price;
            let change_percent = if prev_price.is_zero() {
                Decimal::ZERO
            } else {
                (change / prev_price * Decimal::ONE_HUNDRED).round_dp(4)
            };
            Some(MarketTick {
                metal,
                price: quote.price,
                change_24h: change,
                change_percent,
                volume,
                market_cap: (quote.price * volume * MARKET_CAP_MULTIPLIER).round_dp(2),
                recorded_at: now,
            })
        })
        .collect();
    ticks.sort_by_key(|t| t.metal);
    ticks
}

#[async_trait]
impl PriceSource for LiveSource {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn next_ticks(&self, previous: &PriceSnapshot) -> anyhow::Result<Vec<MarketTick>> {
        let quotes: HashMap<String, LiveQuote> = self
            .http
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let ticks = quotes_to_ticks(quotes, previous);
        if ticks.is_empty() {
            anyhow::bail!("live feed returned no usable quotes");
        }
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::simulator::seed_tick;

    #[test]
    fn test_quotes_to_ticks_relative_to_previous() {
        let raw = r#"{
            "copper": { "price": 8585, "volume": 100 },
            "unobtainium": { "price": 1 },
            "zinc": { "price": 0 }
        }"#;
        let quotes: HashMap<String, LiveQuote> = serde_json::from_str(raw).unwrap();

        let mut previous = PriceSnapshot::new();
        previous.insert(MetalType::Copper, seed_tick(MetalType::Copper, Utc::now()));

        let ticks = quotes_to_ticks(quotes, &previous);
        assert_eq!(ticks.len(), 1);
        let copper = &ticks[0];
        assert_eq!(copper.change_24h, Decimal::from(85));
        assert_eq!(copper.change_percent, Decimal::from(1));
        assert_eq!(copper.market_cap, Decimal::from(8585 * 100 * 10));
    }
}
