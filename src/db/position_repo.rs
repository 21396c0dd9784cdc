use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::position::position_status;
use crate::models::{Direction, MetalType, Position};

/// Fields of a validated new position.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPosition {
    pub metal: MetalType,
    pub direction: Direction,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub contract_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
}

/// Insert a new active position unless the user already holds `max_active`.
///
/// The count and the insert run in one transaction holding a per-user
/// advisory lock, so concurrent creates cannot both pass the limit.
/// Returns `None` when the limit is reached.
pub async fn insert_position(
    pool: &PgPool,
    user_id: Uuid,
    new: &NewPosition,
    max_active: i64,
) -> anyhow::Result<Option<Position>> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let (active,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM positions WHERE user_id = $1 AND status = 'active'",
    )
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    if active >= max_active {
        tx.rollback().await?;
        return Ok(None);
    }

    let pos = sqlx::query_as::<_, Position>(
        r#"
        INSERT INTO positions
            (user_id, metal, direction, quantity, entry_price, target_price, stop_loss,
             contract_date, expiry_date, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(new.metal.as_str())
    .bind(new.direction.as_str())
    .bind(new.quantity)
    .bind(new.entry_price)
    .bind(new.target_price)
    .bind(new.stop_loss)
    .bind(new.contract_date)
    .bind(new.expiry_date)
    .bind(new.notes.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(Some(pos))
}

/// List a user's positions, optionally filtered by status and metal.
pub async fn list_positions(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<&str>,
    metal: Option<MetalType>,
) -> anyhow::Result<Vec<Position>> {
    let positions = sqlx::query_as::<_, Position>(
        r#"
        SELECT * FROM positions
        WHERE user_id = $1
          AND ($2::text IS NULL OR status = $2)
          AND ($3::text IS NULL OR metal = $3)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(status)
    .bind(metal.map(|m| m.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(positions)
}

/// All active positions of a user.
pub async fn get_active_positions(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Position>> {
    list_positions(pool, user_id, Some(position_status::ACTIVE), None).await
}

/// Fetch one position owned by `user_id`.
pub async fn get_position(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> anyhow::Result<Option<Position>> {
    let pos = sqlx::query_as::<_, Position>(
        "SELECT * FROM positions WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(pos)
}

/// Count a user's active positions.
pub async fn count_active_positions(pool: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM positions WHERE user_id = $1 AND status = 'active'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(row.0)
}

/// Update target, stop and notes of an active position. Returns `None` if the
/// position is not active or not owned by the user.
pub async fn update_position_levels(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    target_price: Option<Decimal>,
    stop_loss: Option<Decimal>,
    notes: Option<&str>,
) -> anyhow::Result<Option<Position>> {
    let pos = sqlx::query_as::<_, Position>(
        r#"
        UPDATE positions
        SET target_price = $3, stop_loss = $4, notes = $5, updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND status = 'active'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(target_price)
    .bind(stop_loss)
    .bind(notes)
    .fetch_optional(pool)
    .await?;

    Ok(pos)
}

/// Close an active position and persist its realized P&L in one statement.
///
/// Returns `None` when the position is missing, not owned by the user, or
/// already closed/expired, so a second close never overwrites the first.
pub async fn close_position(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    close_price: Decimal,
    profit_loss: Decimal,
) -> anyhow::Result<Option<Position>> {
    let pos = sqlx::query_as::<_, Position>(
        r#"
        UPDATE positions
        SET status = 'closed', close_price = $3, profit_loss = $4,
            closed_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND user_id = $2 AND status = 'active'
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(close_price)
    .bind(profit_loss)
    .fetch_optional(pool)
    .await?;

    Ok(pos)
}

/// Mark a user's active positions past their expiry date as expired.
pub async fn expire_overdue(
    pool: &PgPool,
    user_id: Uuid,
    today: NaiveDate,
) -> anyhow::Result<Vec<Position>> {
    let expired = sqlx::query_as::<_, Position>(
        r#"
        UPDATE positions
        SET status = 'expired', updated_at = NOW()
        WHERE user_id = $1 AND status = 'active' AND expiry_date < $2
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(today)
    .fetch_all(pool)
    .await?;

    Ok(expired)
}

/// Closed positions of a user with close time and realized P&L since `since`.
pub async fn get_closed_since(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<(DateTime<Utc>, Decimal)>> {
    let rows: Vec<(DateTime<Utc>, Decimal)> = sqlx::query_as(
        r#"
        SELECT closed_at, profit_loss
        FROM positions
        WHERE user_id = $1 AND status = 'closed'
          AND closed_at IS NOT NULL AND profit_loss IS NOT NULL
          AND closed_at >= $2
        ORDER BY closed_at
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
