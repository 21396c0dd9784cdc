use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{AlertKind, MetalType, TradingAlert};

pub async fn create_alert(
    pool: &PgPool,
    user_id: Uuid,
    metal: MetalType,
    kind: AlertKind,
    target_value: Decimal,
) -> anyhow::Result<TradingAlert> {
    let alert = sqlx::query_as::<_, TradingAlert>(
        r#"
        INSERT INTO trading_alerts (user_id, metal, kind, target_value)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(metal.as_str())
    .bind(kind.as_str())
    .bind(target_value)
    .fetch_one(pool)
    .await?;

    Ok(alert)
}

pub async fn list_alerts(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<TradingAlert>> {
    let alerts = sqlx::query_as::<_, TradingAlert>(
        "SELECT * FROM trading_alerts WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(alerts)
}

/// Active alerts across all users for the given metals.
pub async fn get_active_alerts_for(
    pool: &PgPool,
    metals: &[MetalType],
) -> anyhow::Result<Vec<TradingAlert>> {
    let names: Vec<&str> = metals.iter().map(|m| m.as_str()).collect();
    let alerts = sqlx::query_as::<_, TradingAlert>(
        "SELECT * FROM trading_alerts WHERE status = 'active' AND metal = ANY($1)",
    )
    .bind(&names)
    .fetch_all(pool)
    .await?;

    Ok(alerts)
}

/// Flip an alert from active to triggered. Returns `None` if another reader
/// already triggered (or the owner cancelled) it.
pub async fn mark_triggered(pool: &PgPool, id: Uuid) -> anyhow::Result<Option<TradingAlert>> {
    let alert = sqlx::query_as::<_, TradingAlert>(
        r#"
        UPDATE trading_alerts
        SET status = 'triggered', triggered_at = NOW()
        WHERE id = $1 AND status = 'active'
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(alert)
}

/// Cancel an active alert owned by `user_id`.
pub async fn cancel_alert(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<TradingAlert>> {
    let alert = sqlx::query_as::<_, TradingAlert>(
        r#"
        UPDATE trading_alerts
        SET status = 'cancelled'
        WHERE id = $1 AND user_id = $2 AND status = 'active'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(alert)
}
