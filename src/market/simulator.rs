use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;

use crate::models::{MarketTick, MetalType};

use super::{PriceSnapshot, PriceSource};

/// Max move per tick, in hundredths of a basis point (±2.0000%).
const MAX_MOVE_STEPS: i64 = 20_000;
/// Volume factor range in thousandths (0.800 – 1.200).
const VOLUME_FACTOR_MIN: i64 = 800;
const VOLUME_FACTOR_MAX: i64 = 1_200;
/// Volume stays within [0.5, 2] × base volume.
const VOLUME_FLOOR: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
const VOLUME_CEILING: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

pub const MARKET_CAP_MULTIPLIER: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Reference price in USD per tonne.
pub fn base_price(metal: MetalType) -> Decimal {
    match metal {
        MetalType::Copper => Decimal::from(8_500),
        MetalType::Aluminum => Decimal::from(2_200),
        MetalType::Zinc => Decimal::from(2_500),
        MetalType::Nickel => Decimal::from(16_000),
        MetalType::Lead => Decimal::from(2_100),
        MetalType::Tin => Decimal::from(25_000),
    }
}

/// Reference daily volume in tonnes.
pub fn base_volume(metal: MetalType) -> Decimal {
    match metal {
        MetalType::Copper => Decimal::from(150_000),
        MetalType::Aluminum => Decimal::from(220_000),
        MetalType::Zinc => Decimal::from(90_000),
        MetalType::Nickel => Decimal::from(40_000),
        MetalType::Lead => Decimal::from(60_000),
        MetalType::Tin => Decimal::from(8_000),
    }
}

/// Starting point of the walk for a metal with no recorded history.
pub fn seed_tick(metal: MetalType, now: DateTime<Utc>) -> MarketTick {
    let price = base_price(metal);
    let volume = base_volume(metal);
    MarketTick {
        metal,
        price,
        change_24h: Decimal::ZERO,
        change_percent: Decimal::ZERO,
        volume,
        market_cap: price * volume * MARKET_CAP_MULTIPLIER,
        recorded_at: now,
    }
}

/// Advance one step of the random walk from `previous`.
///
/// The price moves by a uniform percentage in [-2%, +2%], volume by a uniform
/// factor in [0.8, 1.2] clamped to [0.5, 2] × base volume. The multiplicative
/// walk drifts downward on average; the clamp keeps volume alerts reachable.
/// Changes are relative to `previous`.
pub fn tick<R: Rng>(previous: &MarketTick, rng: &mut R, now: DateTime<Utc>) -> MarketTick {
    let move_pct = Decimal::new(rng.gen_range(-MAX_MOVE_STEPS..=MAX_MOVE_STEPS), 4);
    let volume_factor = Decimal::new(rng.gen_range(VOLUME_FACTOR_MIN..=VOLUME_FACTOR_MAX), 3);

    let price = (previous.price * (Decimal::ONE + move_pct / Decimal::ONE_HUNDRED)).round_dp(4);
    let base = base_volume(previous.metal);
    let volume = (previous.volume * volume_factor)
        .round_dp(2)
        .clamp(base * VOLUME_FLOOR, base * VOLUME_CEILING);

    MarketTick {
        metal: previous.metal,
        price,
        change_24h: price - previous.price,
        change_percent: move_pct,
        volume,
        market_cap: (price * volume * MARKET_CAP_MULTIPLIER).round_dp(2),
        recorded_at: now,
    }
}

/// Random-walk price source. Seed it for reproducible ticks.
pub struct SimulatedSource {
    rng: Mutex<ChaCha8Rng>,
}

impl SimulatedSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }

    /// One tick per metal, in `MetalType::ALL` order.
    pub fn generate(&self, previous: &PriceSnapshot, now: DateTime<Utc>) -> anyhow::Result<Vec<MarketTick>> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| anyhow::anyhow!("simulator RNG lock poisoned"))?;

        Ok(MetalType::ALL
            .iter()
            .map(|metal| {
                let prev = previous
                    .get(metal)
                    .cloned()
                    .unwrap_or_else(|| seed_tick(*metal, now));
                tick(&prev, &mut *rng, now)
            })
            .collect())
    }
}

#[async_trait]
impl PriceSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn next_ticks(&self, previous: &PriceSnapshot) -> anyhow::Result<Vec<MarketTick>> {
        self.generate(previous, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_tick_moves_within_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut prev = seed_tick(MetalType::Copper, now());
        for _ in 0..200 {
            let next = tick(&prev, &mut rng, now());
            assert!(next.change_percent.abs() <= Decimal::from(2));
            let ratio = next.volume / prev.volume;
            assert!(ratio >= Decimal::new(79, 2) && ratio <= Decimal::new(121, 2));
            assert!(next.volume >= Decimal::from(75_000) && next.volume <= Decimal::from(300_000));
            assert!(next.price > Decimal::ZERO);
            assert_eq!(next.change_24h, next.price - prev.price);
            prev = next;
        }
    }

    #[test]
    fn test_volume_stays_anchored_to_base_over_long_walks() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut prev = seed_tick(MetalType::Copper, now());
        let floor = base_volume(MetalType::Copper) / Decimal::from(2);
        for _ in 0..20_000 {
            prev = tick(&prev, &mut rng, now());
            assert!(prev.volume >= floor);
            assert!(prev.volume <= base_volume(MetalType::Copper) * Decimal::from(2));
        }
        assert!(prev.market_cap >= prev.price * floor * MARKET_CAP_MULTIPLIER - Decimal::ONE);
    }

    #[test]
    fn test_market_cap_formula() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let next = tick(&seed_tick(MetalType::Tin, now()), &mut rng, now());
        assert_eq!(
            next.market_cap,
            (next.price * next.volume * MARKET_CAP_MULTIPLIER).round_dp(2)
        );
    }

    #[test]
    fn test_seeded_sources_are_reproducible() {
        let a = SimulatedSource::new(Some(42));
        let b = SimulatedSource::new(Some(42));
        let prev = PriceSnapshot::new();

        let first_a = a.generate(&prev, now()).unwrap();
        let first_b = b.generate(&prev, now()).unwrap();
        assert_eq!(first_a, first_b);

        let c = SimulatedSource::new(Some(43));
        assert_ne!(first_a, c.generate(&prev, now()).unwrap());
    }

    #[test]
    fn test_generate_covers_every_metal_from_seed() {
        let source = SimulatedSource::new(Some(3));
        let ticks = source.generate(&PriceSnapshot::new(), now()).unwrap();
        assert_eq!(ticks.len(), MetalType::ALL.len());
        for t in &ticks {
            let base = base_price(t.metal);
            let band = base * Decimal::new(2, 2);
            assert!((t.price - base).abs() <= band);
        }
    }

    #[test]
    fn test_generate_continues_from_previous() {
        let source = SimulatedSource::new(Some(9));
        let mut prev = PriceSnapshot::new();
        let mut copper = seed_tick(MetalType::Copper, now());
        copper.price = Decimal::from(9_999);
        prev.insert(MetalType::Copper, copper);

        let ticks = source.generate(&prev, now()).unwrap();
        let next = ticks.iter().find(|t| t.metal == MetalType::Copper).unwrap();
        assert!((next.price - Decimal::from(9_999)).abs() <= Decimal::new(19998, 2));
    }
}
