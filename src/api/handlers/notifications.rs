use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::db::notification_repo;
use crate::errors::AppError;
use crate::models::Notification;
use crate::AppState;

use super::ApiResponse;

const NOTIFICATION_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, AppError> {
    let rows =
        notification_repo::list_notifications(&state.db, user.id, query.unread, NOTIFICATION_LIMIT)
            .await?;
    Ok(ApiResponse::ok(rows))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>, AppError> {
    if !notification_repo::mark_read(&state.db, user.id, id).await? {
        return Err(AppError::NotFound(format!("notification {id} not found")));
    }
    Ok(ApiResponse::ok(id))
}
