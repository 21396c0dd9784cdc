use axum::extract::{Query, State};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::analytics::{
    build_overview, build_series, compute_risk, ClosedTrade, Period, PerformanceSeries,
    PortfolioOverview, RiskSnapshot,
};
use crate::api::auth::AuthUser;
use crate::db::position_repo;
use crate::errors::AppError;
use crate::services::market_service;
use crate::AppState;

use super::positions::expire_overdue;
use super::ApiResponse;

/// Trailing window for the volatility behind portfolio beta.
const BETA_WINDOW_DAYS: i64 = 30;

/// GET /api/dashboard/overview
pub async fn overview(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<PortfolioOverview>>, AppError> {
    expire_overdue(&state, user.id).await?;

    let positions = position_repo::list_positions(&state.db, user.id, None, None).await?;
    let prices = market_service::current_prices(&state).await?;

    Ok(ApiResponse::ok(build_overview(&positions, &prices)))
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    pub period: Option<String>,
}

/// GET /api/dashboard/performance?period=7d|30d|90d|1y
pub async fn performance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<PerformanceQuery>,
) -> Result<Json<ApiResponse<PerformanceSeries>>, AppError> {
    let period = Period::from_query(query.period.as_deref());
    let now = Utc::now();

    let trades: Vec<ClosedTrade> =
        position_repo::get_closed_since(&state.db, user.id, now - period.duration())
            .await?
            .into_iter()
            .map(|(closed_at, profit_loss)| ClosedTrade {
                closed_at,
                profit_loss,
            })
            .collect();

    Ok(ApiResponse::ok(build_series(&trades, period, now)))
}

/// GET /api/dashboard/risk-metrics
pub async fn risk_metrics(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<RiskSnapshot>>, AppError> {
    expire_overdue(&state, user.id).await?;

    let positions = position_repo::get_active_positions(&state.db, user.id).await?;
    let prices = market_service::current_prices(&state).await?;
    let volatility = market_service::trailing_volatility(&state, BETA_WINDOW_DAYS).await?;

    let snapshot = compute_risk(&positions, &prices, &volatility);
    tracing::debug!(
        user_id = %user.id,
        exposure = %snapshot.total_exposure,
        concentration = %snapshot.concentration_risk,
        "Risk snapshot computed"
    );

    Ok(ApiResponse::ok(snapshot))
}
