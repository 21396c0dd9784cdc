use std::collections::HashMap;

use metrics::counter;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;
use crate::db::{alert_repo, notification_repo};
use crate::models::notification::notification_kind;
use crate::models::{AlertKind, MarketTick, MetalType, TradingAlert};

use super::notifier::{self, Notifier};

/// True when `tick` satisfies the alert condition.
pub fn alert_crossed(kind: AlertKind, target: Decimal, tick: &MarketTick) -> bool {
    match kind {
        AlertKind::PriceAbove => tick.price >= target,
        AlertKind::PriceBelow => tick.price <= target,
        AlertKind::VolumeSpike => tick.volume >= target,
    }
}

/// Alerts from `alerts` whose condition holds for the matching new tick.
pub fn crossed_alerts<'a>(
    alerts: &'a [TradingAlert],
    ticks: &HashMap<MetalType, &MarketTick>,
) -> Vec<(&'a TradingAlert, MarketTick)> {
    alerts
        .iter()
        .filter_map(|a| {
            let tick = ticks.get(&a.metal)?;
            alert_crossed(a.kind, a.target_value, tick).then(|| (a, (*tick).clone()))
        })
        .collect()
}

/// Evaluate every active alert against a fresh round of ticks.
///
/// An alert fires at most once: the `active → triggered` update is
/// conditional, and only the caller that wins it stores the notification.
/// Returns the alerts this call triggered.
pub async fn evaluate_alerts(
    pool: &PgPool,
    ticks: &[MarketTick],
    notifier: Option<&Notifier>,
    ws_tx: &broadcast::Sender<WsMessage>,
) -> anyhow::Result<Vec<TradingAlert>> {
    if ticks.is_empty() {
        return Ok(Vec::new());
    }

    let by_metal: HashMap<MetalType, &MarketTick> = ticks.iter().map(|t| (t.metal, t)).collect();
    let metals: Vec<MetalType> = by_metal.keys().copied().collect();
    let alerts = alert_repo::get_active_alerts_for(pool, &metals).await?;

    let mut triggered = Vec::new();
    for (alert, tick) in crossed_alerts(&alerts, &by_metal) {
        let Some(fired) = alert_repo::mark_triggered(pool, alert.id).await? else {
            tracing::debug!(alert_id = %alert.id, "Alert already triggered elsewhere");
            continue;
        };

        let (title, body) = notifier::format_alert_triggered(&fired, &tick);
        notification_repo::insert_notification(
            pool,
            fired.user_id,
            &title,
            &body,
            notification_kind::ALERT_TRIGGERED,
        )
        .await?;

        if let Some(n) = notifier {
            n.send(&notifier::format_push(fired.user_id, &title, &body)).await;
        }

        counter!("alerts_triggered_total").increment(1);
        tracing::info!(
            alert_id = %fired.id,
            user_id = %fired.user_id,
            metal = %fired.metal,
            kind = %fired.kind,
            target = %fired.target_value,
            price = %tick.price,
            "Trading alert triggered"
        );

        // No subscribers is fine
        let _ = ws_tx.send(WsMessage::AlertTriggered(fired.clone()));
        triggered.push(fired);
    }

    Ok(triggered)
}
