use std::sync::OnceLock;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
///
/// Only one recorder can exist per process; later calls return the handle
/// installed by the first.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            // Pre-register counters so they appear even before the first increment.
            counter!("market_ticks_total").absolute(0);
            counter!("price_cache_hits_total").absolute(0);
            counter!("price_cache_misses_total").absolute(0);
            counter!("positions_opened_total").absolute(0);
            counter!("positions_closed_total").absolute(0);
            counter!("alerts_triggered_total").absolute(0);

            gauge!("ws_clients").set(0.0);

            handle
        })
        .clone()
}
