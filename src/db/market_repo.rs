use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{MarketTick, MetalType};

const TICK_COLUMNS: &str =
    "metal, price, change_24h, change_percent, volume, market_cap, recorded_at";

/// Append a round of ticks in one transaction.
pub async fn insert_ticks(pool: &PgPool, ticks: &[MarketTick]) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;

    for t in ticks {
        sqlx::query(
            r#"
            INSERT INTO market_data (metal, price, change_24h, change_percent, volume, market_cap, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(t.metal.as_str())
        .bind(t.price)
        .bind(t.change_24h)
        .bind(t.change_percent)
        .bind(t.volume)
        .bind(t.market_cap)
        .bind(t.recorded_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Newest tick per metal, regardless of age.
pub async fn latest_ticks(pool: &PgPool) -> anyhow::Result<Vec<MarketTick>> {
    let ticks = sqlx::query_as::<_, MarketTick>(&format!(
        "SELECT DISTINCT ON (metal) {TICK_COLUMNS} FROM market_data ORDER BY metal, recorded_at DESC, id DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(ticks)
}

/// Newest tick per metal recorded at or after `since`.
pub async fn latest_ticks_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<MarketTick>> {
    let ticks = sqlx::query_as::<_, MarketTick>(&format!(
        r#"
        SELECT DISTINCT ON (metal) {TICK_COLUMNS}
        FROM market_data
        WHERE recorded_at >= $1
        ORDER BY metal, recorded_at DESC, id DESC
        "#
    ))
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(ticks)
}

/// Newest tick for one metal recorded at or after `since`.
pub async fn latest_tick_since(
    pool: &PgPool,
    metal: MetalType,
    since: DateTime<Utc>,
) -> anyhow::Result<Option<MarketTick>> {
    let tick = sqlx::query_as::<_, MarketTick>(&format!(
        r#"
        SELECT {TICK_COLUMNS}
        FROM market_data
        WHERE metal = $1 AND recorded_at >= $2
        ORDER BY recorded_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(metal.as_str())
    .bind(since)
    .fetch_optional(pool)
    .await?;

    Ok(tick)
}

/// Ticks for a metal since `since`, oldest first.
pub async fn get_history(
    pool: &PgPool,
    metal: MetalType,
    since: DateTime<Utc>,
    limit: i64,
) -> anyhow::Result<Vec<MarketTick>> {
    let ticks = sqlx::query_as::<_, MarketTick>(&format!(
        r#"
        SELECT {TICK_COLUMNS} FROM (
            SELECT id, {TICK_COLUMNS}
            FROM market_data
            WHERE metal = $1 AND recorded_at >= $2
            ORDER BY recorded_at DESC, id DESC
            LIMIT $3
        ) recent
        ORDER BY recorded_at ASC, id ASC
        "#
    ))
    .bind(metal.as_str())
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(ticks)
}

/// Average absolute percent change per metal since `since`.
pub async fn avg_abs_change_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<(MetalType, Decimal)>> {
    let rows: Vec<(String, Option<Decimal>)> = sqlx::query_as(
        r#"
        SELECT metal, AVG(ABS(change_percent))
        FROM market_data
        WHERE recorded_at >= $1
        GROUP BY metal
        "#,
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(metal, avg)| Some((MetalType::from_api_str(&metal)?, avg.unwrap_or(Decimal::ZERO))))
        .collect())
}
