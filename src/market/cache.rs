use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::PriceSnapshot;

/// Process-scoped price cache with an explicit TTL.
///
/// Within the TTL every reader gets the same `Arc` snapshot. The last stored
/// snapshot is kept after expiry so the next refresh can continue the walk
/// from it.
#[derive(Clone)]
pub struct PriceCache {
    ttl: Duration,
    inner: Arc<RwLock<Option<CachedSnapshot>>>,
}

struct CachedSnapshot {
    ticks: Arc<PriceSnapshot>,
    stored_at: Instant,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Arc::new(RwLock::new(None)),
        }
    }

    /// Fresh snapshot, if one was stored less than `ttl` ago.
    pub async fn get(&self) -> Option<Arc<PriceSnapshot>> {
        self.get_at(Instant::now()).await
    }

    pub async fn get_at(&self, now: Instant) -> Option<Arc<PriceSnapshot>> {
        let inner = self.inner.read().await;
        inner
            .as_ref()
            .filter(|c| now.saturating_duration_since(c.stored_at) < self.ttl)
            .map(|c| Arc::clone(&c.ticks))
    }

    /// Last stored snapshot regardless of age.
    pub async fn last_known(&self) -> Option<Arc<PriceSnapshot>> {
        self.inner.read().await.as_ref().map(|c| Arc::clone(&c.ticks))
    }

    pub async fn store(&self, ticks: PriceSnapshot) -> Arc<PriceSnapshot> {
        self.store_at(ticks, Instant::now()).await
    }

    pub async fn store_at(&self, ticks: PriceSnapshot, now: Instant) -> Arc<PriceSnapshot> {
        let ticks = Arc::new(ticks);
        *self.inner.write().await = Some(CachedSnapshot {
            ticks: Arc::clone(&ticks),
            stored_at: now,
        });
        ticks
    }
}
