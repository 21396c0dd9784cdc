use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use crate::api::ws_types::WsMessage;
use crate::db::market_repo;
use crate::market::{PriceSnapshot, Refresh};
use crate::models::MetalType;
use crate::AppState;

use super::alert_monitor;

/// Read the feed through its cache. When the read generated a new round of
/// ticks, alerts are evaluated and the ticks are broadcast to WS clients.
///
/// This is the only refresh path: there is no background scheduler.
pub async fn refresh(state: &AppState) -> anyhow::Result<Arc<PriceSnapshot>> {
    match state.feed.snapshot(&state.db).await? {
        Refresh::Cached(snapshot) => Ok(snapshot),
        Refresh::Ticked { snapshot, ticks } => {
            let _ = state.ws_tx.send(WsMessage::PriceUpdate(ticks.clone()));

            // Alert errors are logged; the price read still succeeds.
            if let Err(e) = alert_monitor::evaluate_alerts(
                &state.db,
                &ticks,
                state.notifier.as_deref(),
                &state.ws_tx,
            )
            .await
            {
                tracing::error!(error = %e, "Alert evaluation failed");
            }

            Ok(snapshot)
        }
    }
}

/// Refresh if due, then return the latest price per metal within the
/// freshness window.
pub async fn current_prices(state: &AppState) -> anyhow::Result<HashMap<MetalType, Decimal>> {
    refresh(state).await?;
    state.feed.latest_prices(&state.db).await
}

/// Refresh if due, then return the current price of one metal, or `fallback`
/// when the freshness window holds no tick for it.
pub async fn current_price(
    state: &AppState,
    metal: MetalType,
    fallback: Decimal,
) -> anyhow::Result<Decimal> {
    refresh(state).await?;
    state.feed.current_price(&state.db, metal, fallback).await
}

/// Average absolute percent change per metal over the trailing `days`.
pub async fn trailing_volatility(
    state: &AppState,
    days: i64,
) -> anyhow::Result<HashMap<MetalType, Decimal>> {
    let since = Utc::now() - Duration::days(days);
    let rows = market_repo::avg_abs_change_since(&state.db, since).await?;
    Ok(rows.into_iter().collect())
}
