use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Notification;

pub async fn insert_notification(
    pool: &PgPool,
    user_id: Uuid,
    title: &str,
    message: &str,
    kind: &str,
) -> anyhow::Result<Notification> {
    let n = sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, title, message, kind)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(kind)
    .fetch_one(pool)
    .await?;

    Ok(n)
}

/// Most recent notifications for a user.
pub async fn list_notifications(
    pool: &PgPool,
    user_id: Uuid,
    unread_only: bool,
    limit: i64,
) -> anyhow::Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR is_read = FALSE)
        ORDER BY created_at DESC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Mark one notification read. Returns false if it does not belong to the user.
pub async fn mark_read(pool: &PgPool, user_id: Uuid, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
