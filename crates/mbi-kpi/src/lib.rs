//! KPI computation for attributed TV spot campaigns.
//!
//! Everything here is pure: the same dataset and targets always produce an
//! equal [`KpiSet`].

pub mod breakdown;
pub mod calculator;
pub mod format;
pub mod types;

pub use breakdown::{compute_breakdowns, compute_daily_trends};
pub use calculator::compute;
pub use types::{
    BreakdownRow, Breakdowns, DailyTrend, DateRange, Direction, ExecutiveStatements, Grade,
    KpiSet, Metric, MetricUnit, MetricValue, SliceStats, StationDaypartRow, TargetComparison,
    TargetStatus, Totals,
};
