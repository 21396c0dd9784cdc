use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::db::market_repo;
use crate::errors::AppError;
use crate::models::{MarketTick, MetalType};
use crate::services::market_service;
use crate::AppState;

use super::ApiResponse;

const DEFAULT_HISTORY_DAYS: i64 = 7;
const MAX_HISTORY_DAYS: i64 = 90;
const HISTORY_LIMIT: i64 = 1000;

#[derive(Debug, Serialize)]
pub struct MetalQuote {
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    pub volume: Decimal,
    pub market_cap: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl From<&MarketTick> for MetalQuote {
    fn from(t: &MarketTick) -> Self {
        Self {
            price: t.price,
            change: t.change_24h,
            change_percent: t.change_percent,
            volume: t.volume,
            market_cap: t.market_cap,
            timestamp: t.recorded_at,
        }
    }
}

/// GET /api/market/data: latest quote per metal, refreshed when the cache
/// has expired.
pub async fn data(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BTreeMap<MetalType, MetalQuote>>>, AppError> {
    let snapshot = market_service::refresh(&state).await?;
    let quotes = snapshot
        .iter()
        .map(|(metal, tick)| (*metal, MetalQuote::from(tick)))
        .collect();

    Ok(ApiResponse::ok(quotes))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct MetalHistory {
    pub metal: MetalType,
    pub days: i64,
    pub ticks: Vec<MarketTick>,
}

/// GET /api/market/history/:metal?days=
pub async fn history(
    State(state): State<AppState>,
    Path(metal): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<MetalHistory>>, AppError> {
    let metal = MetalType::from_api_str(&metal)
        .ok_or_else(|| AppError::Validation(format!("unknown metal type: {metal}")))?;
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    if !(1..=MAX_HISTORY_DAYS).contains(&days) {
        return Err(AppError::Validation(format!(
            "days must be between 1 and {MAX_HISTORY_DAYS}"
        )));
    }

    let since = Utc::now() - Duration::days(days);
    let ticks = market_repo::get_history(&state.db, metal, since, HISTORY_LIMIT).await?;

    Ok(ApiResponse::ok(MetalHistory { metal, days, ticks }))
}
