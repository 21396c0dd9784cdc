use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{NaiveDate, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::analytics::{compute_pnl, days_to_expiry, position_pnl};
use crate::api::auth::AuthUser;
use crate::api::ws_types::WsMessage;
use crate::db::{notification_repo, position_repo};
use crate::errors::AppError;
use crate::market::feed::price_or;
use crate::models::notification::notification_kind;
use crate::models::position::position_status;
use crate::models::{MetalType, Position, PositionView};
use crate::services::notifier;
use crate::services::position_rules::{self, PositionInput, PositionViolation};
use crate::services::market_service;
use crate::AppState;

use super::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub metal: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePositionRequest {
    pub metal: String,
    pub direction: String,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub contract_date: Option<NaiveDate>,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePositionRequest {
    pub target_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClosePositionRequest {
    pub close_price: Option<Decimal>,
}

/// Expire the user's overdue positions and record a notification for each.
pub(super) async fn expire_overdue(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let today = Utc::now().date_naive();
    let expired = position_repo::expire_overdue(&state.db, user_id, today).await?;

    for pos in &expired {
        notification_repo::insert_notification(
            &state.db,
            user_id,
            &format!("{} position expired", pos.metal),
            &format!(
                "{} {} {} reached its expiry date {}",
                pos.direction, pos.quantity, pos.metal, pos.expiry_date
            ),
            notification_kind::POSITION_EXPIRED,
        )
        .await?;
        tracing::info!(position_id = %pos.id, user_id = %user_id, "Position expired");
    }

    Ok(())
}

fn to_view(position: Position, current_price: Decimal, today: NaiveDate) -> PositionView {
    let pnl = position_pnl(&position, current_price);
    let days = days_to_expiry(position.expiry_date, today);
    PositionView {
        position,
        current_price,
        pnl: pnl.amount,
        pnl_percent: pnl.percent,
        days_to_expiry: days,
    }
}

/// GET /api/positions?status=&metal=
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<PositionView>>>, AppError> {
    let status = match query.status.as_deref() {
        Some(s) if !position_status::is_valid(s) => {
            return Err(AppError::Validation(format!("unknown position status: {s}")))
        }
        other => other,
    };
    let metal = match query.metal.as_deref() {
        Some(m) => Some(
            MetalType::from_api_str(m)
                .ok_or_else(|| AppError::Validation(format!("unknown metal type: {m}")))?,
        ),
        None => None,
    };

    expire_overdue(&state, user.id).await?;

    let positions = position_repo::list_positions(&state.db, user.id, status, metal).await?;
    let prices = market_service::current_prices(&state).await?;
    let today = Utc::now().date_naive();

    let views = positions
        .into_iter()
        .map(|p| {
            let price = price_or(&prices, p.metal, p.entry_price);
            to_view(p, price, today)
        })
        .collect();

    Ok(ApiResponse::ok(views))
}

/// GET /api/positions/:id
pub async fn detail(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PositionView>>, AppError> {
    expire_overdue(&state, user.id).await?;

    let position = position_repo::get_position(&state.db, user.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("position {id} not found")))?;
    let price = market_service::current_price(&state, position.metal, position.entry_price).await?;

    Ok(ApiResponse::ok(to_view(position, price, Utc::now().date_naive())))
}

/// POST /api/positions
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreatePositionRequest>,
) -> Result<Json<ApiResponse<PositionView>>, AppError> {
    let today = Utc::now().date_naive();
    let new = position_rules::validate_input(&PositionInput {
        metal: body.metal,
        direction: body.direction,
        quantity: body.quantity,
        entry_price: body.entry_price,
        target_price: body.target_price,
        stop_loss: body.stop_loss,
        contract_date: body.contract_date.unwrap_or(today),
        expiry_date: body.expiry_date,
        notes: body.notes,
    })?;

    expire_overdue(&state, user.id).await?;
    let active = position_repo::count_active_positions(&state.db, user.id).await?;
    position_rules::check_position_limit(user.tier, active)?;

    let market = market_service::current_price(&state, new.metal, new.entry_price).await?;
    position_rules::check_price_band(new.entry_price, market, state.config.price_band_pct)?;

    let max_active = user.tier.position_limit();
    let position = position_repo::insert_position(&state.db, user.id, &new, max_active)
        .await?
        .ok_or(PositionViolation::TooManyPositions {
            tier: user.tier,
            current: max_active,
            max: max_active,
        })?;
    counter!("positions_opened_total").increment(1);
    tracing::info!(
        position_id = %position.id,
        user_id = %user.id,
        metal = %position.metal,
        direction = %position.direction,
        quantity = %position.quantity,
        entry_price = %position.entry_price,
        "Position opened"
    );

    let _ = state.ws_tx.send(WsMessage::PositionUpdate(position.clone()));

    Ok(ApiResponse::ok(to_view(position, market, today)))
}

/// PUT /api/positions/:id: target, stop-loss and notes of an active position.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePositionRequest>,
) -> Result<Json<ApiResponse<PositionView>>, AppError> {
    position_rules::validate_levels(body.target_price, body.stop_loss)?;
    expire_overdue(&state, user.id).await?;

    let notes = body.notes.as_deref().filter(|n| !n.trim().is_empty());
    let position = position_repo::update_position_levels(
        &state.db,
        user.id,
        id,
        body.target_price,
        body.stop_loss,
        notes,
    )
    .await?
    .ok_or_else(|| AppError::NotFound(format!("active position {id} not found")))?;

    let price = market_service::current_price(&state, position.metal, position.entry_price).await?;
    let _ = state.ws_tx.send(WsMessage::PositionUpdate(position.clone()));

    Ok(ApiResponse::ok(to_view(position, price, Utc::now().date_naive())))
}

/// POST /api/positions/:id/close
///
/// Without a positive `close_price` the position closes at the current
/// market price. The realized P&L is fixed at this point.
pub async fn close(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    body: Option<Json<ClosePositionRequest>>,
) -> Result<Json<ApiResponse<PositionView>>, AppError> {
    expire_overdue(&state, user.id).await?;

    let position = position_repo::get_position(&state.db, user.id, id)
        .await?
        .filter(Position::is_active)
        .ok_or_else(|| AppError::NotFound(format!("active position {id} not found")))?;

    let requested = body
        .and_then(|Json(b)| b.close_price)
        .filter(|p| *p > Decimal::ZERO);
    let close_price = match requested {
        Some(p) => p,
        None => market_service::current_price(&state, position.metal, position.entry_price).await?,
    };

    let pnl = compute_pnl(position.direction, position.quantity, position.entry_price, close_price);

    // Conditional on status = 'active'; a concurrent close loses here.
    let closed = position_repo::close_position(&state.db, user.id, id, close_price, pnl.amount)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("active position {id} not found")))?;

    let (title, message) = notifier::format_position_closed(&closed, close_price, pnl.amount);
    notification_repo::insert_notification(
        &state.db,
        user.id,
        &title,
        &message,
        notification_kind::POSITION_CLOSED,
    )
    .await?;
    if let Some(n) = &state.notifier {
        n.send(&notifier::format_push(closed.user_id, &title, &message)).await;
    }

    counter!("positions_closed_total").increment(1);
    tracing::info!(
        position_id = %closed.id,
        user_id = %user.id,
        close_price = %close_price,
        profit_loss = %pnl.amount,
        "Position closed"
    );

    let _ = state.ws_tx.send(WsMessage::PositionUpdate(closed.clone()));

    Ok(ApiResponse::ok(to_view(closed, close_price, Utc::now().date_naive())))
}
