use axum::extract::{Path, State};
use axum::{Extension, Json};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::auth::AuthUser;
use crate::db::alert_repo;
use crate::errors::AppError;
use crate::models::{AlertKind, MetalType, TradingAlert};
use crate::AppState;

use super::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub metal: String,
    pub kind: String,
    pub target_value: Decimal,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<Vec<TradingAlert>>>, AppError> {
    let alerts = alert_repo::list_alerts(&state.db, user.id).await?;
    Ok(ApiResponse::ok(alerts))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateAlertRequest>,
) -> Result<Json<ApiResponse<TradingAlert>>, AppError> {
    let metal = MetalType::from_api_str(&body.metal)
        .ok_or_else(|| AppError::Validation(format!("unknown metal type: {}", body.metal)))?;
    let kind = AlertKind::from_api_str(&body.kind)
        .ok_or_else(|| AppError::Validation(format!("unknown alert kind: {}", body.kind)))?;
    if body.target_value <= Decimal::ZERO {
        return Err(AppError::Validation("target_value must be greater than zero".into()));
    }

    let alert = alert_repo::create_alert(&state.db, user.id, metal, kind, body.target_value).await?;
    tracing::info!(
        alert_id = %alert.id,
        user_id = %user.id,
        metal = %metal,
        kind = %kind,
        target = %alert.target_value,
        "Trading alert created"
    );

    Ok(ApiResponse::ok(alert))
}

/// DELETE /api/alerts/:id: cancels an active alert.
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TradingAlert>>, AppError> {
    let alert = alert_repo::cancel_alert(&state.db, user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("active alert {id} not found")))?;

    Ok(ApiResponse::ok(alert))
}
