use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use mbi_core::KpiTargets;
use rust_decimal::Decimal;
use serde::Serialize;

/// Decimal places kept on computed ratios.
pub const RATIO_DP: u32 = 6;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Roas,
    Cpo,
    Cpm,
    Cpv,
    Cpl,
    VisitToOrderRate,
    LeadToOrderRate,
    AverageOrderValue,
    RevenuePerVisit,
}

/// How a metric's value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Multiple,
    Currency,
    Rate,
}

impl Metric {
    pub const ALL: [Metric; 9] = [
        Metric::Roas,
        Metric::Cpo,
        Metric::Cpm,
        Metric::Cpv,
        Metric::Cpl,
        Metric::VisitToOrderRate,
        Metric::LeadToOrderRate,
        Metric::AverageOrderValue,
        Metric::RevenuePerVisit,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Metric::Roas => "ROAS",
            Metric::Cpo => "CPO",
            Metric::Cpm => "CPM",
            Metric::Cpv => "Cost per Visit",
            Metric::Cpl => "Cost per Lead",
            Metric::VisitToOrderRate => "Visit to Order Rate",
            Metric::LeadToOrderRate => "Lead to Order Rate",
            Metric::AverageOrderValue => "Average Order Value",
            Metric::RevenuePerVisit => "Revenue per Visit",
        }
    }

    #[must_use]
    pub fn unit(self) -> MetricUnit {
        match self {
            Metric::Roas => MetricUnit::Multiple,
            Metric::VisitToOrderRate | Metric::LeadToOrderRate => MetricUnit::Rate,
            Metric::Cpo
            | Metric::Cpm
            | Metric::Cpv
            | Metric::Cpl
            | Metric::AverageOrderValue
            | Metric::RevenuePerVisit => MetricUnit::Currency,
        }
    }
}

/// A computed metric, or the marker for a zero denominator.
///
/// Serialises as a decimal string or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Value(Decimal),
    NotComputable,
}

impl MetricValue {
    /// `numerator / denominator`, or `NotComputable` when the denominator is
    /// zero or the quotient overflows.
    #[must_use]
    pub fn ratio(numerator: Decimal, denominator: Decimal) -> Self {
        if denominator.is_zero() {
            return MetricValue::NotComputable;
        }
        numerator
            .checked_div(denominator)
            .map_or(MetricValue::NotComputable, |v| {
                MetricValue::Value(v.round_dp(RATIO_DP).normalize())
            })
    }

    /// `numerator / denominator * 1000`, the CPM-style scaling.
    #[must_use]
    pub fn per_thousand(numerator: Decimal, denominator: Decimal) -> Self {
        match numerator.checked_mul(Decimal::ONE_THOUSAND) {
            Some(scaled) => Self::ratio(scaled, denominator),
            None => MetricValue::NotComputable,
        }
    }

    #[must_use]
    pub fn value(self) -> Option<Decimal> {
        match self {
            MetricValue::Value(v) => Some(v),
            MetricValue::NotComputable => None,
        }
    }

    #[must_use]
    pub fn is_computable(self) -> bool {
        matches!(self, MetricValue::Value(_))
    }
}

// ---------------------------------------------------------------------------
// Target comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Above,
    At,
    Below,
}

impl TargetStatus {
    #[must_use]
    pub fn meets_target(self) -> bool {
        matches!(self, TargetStatus::Above | TargetStatus::At)
    }
}

impl fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TargetStatus::Above => "above target",
            TargetStatus::At => "at target",
            TargetStatus::Below => "below target",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Grade a normalised performance ratio (1.0 means exactly on target).
    #[must_use]
    pub fn from_ratio(ratio: Decimal) -> Self {
        if ratio >= Decimal::new(12, 1) {
            Grade::A
        } else if ratio >= Decimal::ONE {
            Grade::B
        } else if ratio >= Decimal::new(8, 1) {
            Grade::C
        } else if ratio >= Decimal::new(6, 1) {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// A computed metric measured against its configured target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetComparison {
    pub metric: Metric,
    pub actual: Decimal,
    pub target: Decimal,
    pub direction: Direction,
    /// Normalised so that `>= 1` always means "meets or beats the target".
    pub performance_ratio: Decimal,
    pub status: TargetStatus,
    pub grade: Grade,
}

// ---------------------------------------------------------------------------
// Totals, breakdowns, trends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub spots: usize,
    pub clients: usize,
    pub spend: Decimal,
    pub revenue: Decimal,
    pub impressions: i64,
    pub visits: i64,
    pub orders: i64,
    pub leads: i64,
}

/// Aggregates for one slice of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceStats {
    pub spots: usize,
    pub visits: i64,
    pub avg_visits_per_spot: Decimal,
    pub revenue: Decimal,
    pub impressions: i64,
    pub cost: Decimal,
    pub cpm: MetricValue,
    pub visits_per_thousand_impressions: MetricValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownRow {
    pub name: String,
    #[serde(flatten)]
    pub stats: SliceStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationDaypartRow {
    pub station: String,
    pub daypart: String,
    #[serde(flatten)]
    pub stats: SliceStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Breakdowns {
    pub by_station: Vec<BreakdownRow>,
    pub by_daypart: Vec<BreakdownRow>,
    pub by_market: Vec<BreakdownRow>,
    pub by_station_daypart: Vec<StationDaypartRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub spots: usize,
    pub revenue: Decimal,
    pub visits: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Whole days covered, counting both ends.
    #[must_use]
    pub fn span_days(&self) -> i64 {
        (self.end.date_naive() - self.start.date_naive()).num_days() + 1
    }
}

/// Plain-language statements for the executive summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutiveStatements {
    pub overall_performance: Option<String>,
    pub campaign_scale: String,
    pub attribution_quality: String,
}

impl ExecutiveStatements {
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        self.overall_performance
            .as_deref()
            .into_iter()
            .chain([
                self.campaign_scale.as_str(),
                self.attribution_quality.as_str(),
            ])
            .collect()
    }
}

// ---------------------------------------------------------------------------
// KpiSet
// ---------------------------------------------------------------------------

/// Everything computed from one dataset and one set of targets.
///
/// Holds no wall-clock data: computing twice over the same input yields equal
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiSet {
    pub totals: Totals,
    pub efficiency: BTreeMap<Metric, MetricValue>,
    pub targets: KpiTargets,
    pub comparisons: Vec<TargetComparison>,
    pub breakdowns: Breakdowns,
    pub daily_trends: Vec<DailyTrend>,
    pub date_range: Option<DateRange>,
    /// Completeness of the key attribution fields, 0 to 100.
    pub data_quality_score: Decimal,
    pub statements: ExecutiveStatements,
}

impl KpiSet {
    #[must_use]
    pub fn metric(&self, metric: Metric) -> MetricValue {
        self.efficiency
            .get(&metric)
            .copied()
            .unwrap_or(MetricValue::NotComputable)
    }

    #[must_use]
    pub fn comparison(&self, metric: Metric) -> Option<&TargetComparison> {
        self.comparisons.iter().find(|c| c.metric == metric)
    }
}
