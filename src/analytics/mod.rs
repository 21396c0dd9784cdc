pub mod performance;
pub mod pnl;
pub mod risk;

pub use performance::{
    build_overview, build_series, ClosedTrade, Period, PerformanceSeries, PortfolioOverview,
};
pub use pnl::{compute_pnl, days_to_expiry, position_pnl, PnL};
pub use risk::{compute_risk, RiskLevel, RiskSnapshot};
