use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::position::position_status;
use crate::models::{MetalType, Position};

use super::pnl::compute_pnl;

/// Reporting window for the performance series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
}

/// Granularity of one performance bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Day,
    Week,
    Month,
}

impl Period {
    /// Parse `7d`, `30d`, `90d` or `1y`. Anything else falls back to `30d`.
    pub fn from_query(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("7d") => Period::Week,
            Some("90d") => Period::Quarter,
            Some("1y") => Period::Year,
            _ => Period::Month,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "7d",
            Period::Month => "30d",
            Period::Quarter => "90d",
            Period::Year => "1y",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Period::Week => Duration::days(7),
            Period::Month => Duration::days(30),
            Period::Quarter => Duration::days(90),
            Period::Year => Duration::days(365),
        }
    }

    pub fn bucket(&self) -> Bucket {
        match self {
            Period::Week | Period::Month => Bucket::Day,
            Period::Quarter => Bucket::Week,
            Period::Year => Bucket::Month,
        }
    }
}

impl Bucket {
    /// First day of the bucket containing `date`. Weeks start on Monday.
    pub fn start_of(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Day => date,
            Bucket::Week => date - Duration::days(date.weekday().num_days_from_monday() as i64),
            Bucket::Month => date.with_day(1).unwrap_or(date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformancePoint {
    pub bucket_start: NaiveDate,
    pub realized_pnl: Decimal,
    pub cumulative_pnl: Decimal,
    pub trades: i64,
    pub wins: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSeries {
    pub period: &'static str,
    pub bucket: Bucket,
    pub points: Vec<PerformancePoint>,
    pub total_realized_pnl: Decimal,
}

/// A realized trade outcome: close time and profit/loss.
#[derive(Debug, Clone, Copy)]
pub struct ClosedTrade {
    pub closed_at: DateTime<Utc>,
    pub profit_loss: Decimal,
}

/// Group closed trades inside the period into time buckets with a running
/// cumulative realized P&L. Trades outside `[now - period, now]` are skipped.
pub fn build_series(trades: &[ClosedTrade], period: Period, now: DateTime<Utc>) -> PerformanceSeries {
    let since = now - period.duration();
    let bucket = period.bucket();

    let mut grouped: BTreeMap<NaiveDate, (Decimal, i64, i64)> = BTreeMap::new();
    for trade in trades.iter().filter(|t| t.closed_at >= since && t.closed_at <= now) {
        let key = bucket.start_of(trade.closed_at.date_naive());
        let entry = grouped.entry(key).or_insert((Decimal::ZERO, 0, 0));
        entry.0 += trade.profit_loss;
        entry.1 += 1;
        if trade.profit_loss > Decimal::ZERO {
            entry.2 += 1;
        }
    }

    let mut cumulative = Decimal::ZERO;
    let points: Vec<PerformancePoint> = grouped
        .into_iter()
        .map(|(bucket_start, (pnl, trades, wins))| {
            cumulative += pnl;
            PerformancePoint {
                bucket_start,
                realized_pnl: pnl,
                cumulative_pnl: cumulative,
                trades,
                wins,
            }
        })
        .collect();

    PerformanceSeries {
        period: period.as_str(),
        bucket,
        points,
        total_realized_pnl: cumulative,
    }
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetalBreakdown {
    pub positions: i64,
    pub exposure: Decimal,
    pub unrealized_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioOverview {
    pub total_positions: i64,
    pub active_positions: i64,
    pub closed_positions: i64,
    pub expired_positions: i64,
    pub total_exposure: Decimal,
    pub unrealized_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub win_rate: Decimal,
    pub by_metal: BTreeMap<MetalType, MetalBreakdown>,
}

/// Summarise every position a user owns. Active positions are marked at the
/// latest price (entry price when the metal has none); closed positions
/// contribute their persisted realized P&L.
pub fn build_overview(
    positions: &[Position],
    prices: &HashMap<MetalType, Decimal>,
) -> PortfolioOverview {
    let mut overview = PortfolioOverview {
        total_positions: positions.len() as i64,
        active_positions: 0,
        closed_positions: 0,
        expired_positions: 0,
        total_exposure: Decimal::ZERO,
        unrealized_pnl: Decimal::ZERO,
        realized_pnl: Decimal::ZERO,
        win_rate: Decimal::ZERO,
        by_metal: BTreeMap::new(),
    };
    let mut wins = 0i64;

    for pos in positions {
        match pos.status.as_str() {
            position_status::ACTIVE => {
                let price = prices.get(&pos.metal).copied().unwrap_or(pos.entry_price);
                let pnl = compute_pnl(pos.direction, pos.quantity, pos.entry_price, price).amount;
                overview.active_positions += 1;
                overview.total_exposure += pos.exposure();
                overview.unrealized_pnl += pnl;

                let metal = overview.by_metal.entry(pos.metal).or_default();
                metal.positions += 1;
                metal.exposure += pos.exposure();
                metal.unrealized_pnl += pnl;
            }
            position_status::CLOSED => {
                overview.closed_positions += 1;
                let realized = pos.profit_loss.unwrap_or(Decimal::ZERO);
                overview.realized_pnl += realized;
                if realized > Decimal::ZERO {
                    wins += 1;
                }
            }
            position_status::EXPIRED => overview.expired_positions += 1,
            _ => {}
        }
    }

    overview.win_rate = win_rate(wins, overview.closed_positions);
    overview
}

/// wins / closed × 100, zero when nothing has closed.
pub fn win_rate(wins: i64, closed: i64) -> Decimal {
    if closed == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(wins) / Decimal::from(closed) * Decimal::ONE_HUNDRED
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
