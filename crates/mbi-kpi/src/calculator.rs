//! Pure KPI computation over one [`CampaignDataset`].

use std::collections::BTreeMap;

use mbi_core::{CampaignDataset, CampaignRecord, KpiTargets};
use rust_decimal::Decimal;

use crate::breakdown::{compute_breakdowns, compute_daily_trends};
use crate::types::{
    DateRange, Direction, ExecutiveStatements, Grade, KpiSet, Metric, MetricValue,
    TargetComparison, TargetStatus, Totals, RATIO_DP,
};

/// Points each key field contributes to the data-quality score.
const QUALITY_POINTS_PER_FIELD: i64 = 25;

const LARGE_CAMPAIGN_SPOTS: usize = 100;
const MEDIUM_CAMPAIGN_SPOTS: usize = 50;

/// Compute totals, efficiency metrics, target comparisons and breakdowns.
///
/// Null attribution values are skipped, never treated as errors. An empty
/// dataset yields zero totals and `NotComputable` ratios.
#[must_use]
pub fn compute(dataset: &CampaignDataset, targets: &KpiTargets) -> KpiSet {
    let records = dataset.records();
    let totals = compute_totals(dataset);
    let efficiency = compute_efficiency(&totals);
    let comparisons = compare_to_targets(&efficiency, targets);
    let statements = executive_statements(&totals, &comparisons);

    tracing::debug!(
        spots = totals.spots,
        computable = efficiency.values().filter(|v| v.is_computable()).count(),
        graded = comparisons.len(),
        "computed campaign KPIs"
    );

    KpiSet {
        totals,
        efficiency,
        targets: targets.clone(),
        comparisons,
        breakdowns: compute_breakdowns(records),
        daily_trends: compute_daily_trends(records),
        date_range: dataset
            .date_range()
            .map(|(start, end)| DateRange { start, end }),
        data_quality_score: data_quality_score(records),
        statements,
    }
}

fn compute_totals(dataset: &CampaignDataset) -> Totals {
    let records = dataset.records();
    Totals {
        spots: records.len(),
        clients: dataset.distinct_clients(),
        spend: sum_decimal(records.iter().filter_map(|r| r.spot_cost)),
        revenue: sum_decimal(records.iter().filter_map(|r| r.online_revenue)),
        impressions: sum_count(records.iter().filter_map(|r| r.impressions)),
        visits: sum_count(records.iter().filter_map(|r| r.online_visits)),
        orders: sum_count(records.iter().filter_map(|r| r.online_orders)),
        leads: sum_count(records.iter().filter_map(|r| r.online_leads)),
    }
}

fn compute_efficiency(totals: &Totals) -> BTreeMap<Metric, MetricValue> {
    let spend = totals.spend;
    let revenue = totals.revenue;
    let impressions = Decimal::from(totals.impressions);
    let visits = Decimal::from(totals.visits);
    let orders = Decimal::from(totals.orders);
    let leads = Decimal::from(totals.leads);

    Metric::ALL
        .into_iter()
        .map(|metric| {
            let value = match metric {
                Metric::Roas => MetricValue::ratio(revenue, spend),
                Metric::Cpo => MetricValue::ratio(spend, orders),
                Metric::Cpm => MetricValue::per_thousand(spend, impressions),
                Metric::Cpv => MetricValue::ratio(spend, visits),
                Metric::Cpl => MetricValue::ratio(spend, leads),
                Metric::VisitToOrderRate => MetricValue::ratio(orders, visits),
                Metric::LeadToOrderRate => MetricValue::ratio(orders, leads),
                Metric::AverageOrderValue => MetricValue::ratio(revenue, orders),
                Metric::RevenuePerVisit => MetricValue::ratio(revenue, visits),
            };
            (metric, value)
        })
        .collect()
}

fn compare_to_targets(
    efficiency: &BTreeMap<Metric, MetricValue>,
    targets: &KpiTargets,
) -> Vec<TargetComparison> {
    [
        (Metric::Roas, targets.roas_target, Direction::HigherIsBetter),
        (Metric::Cpo, targets.cpo_target, Direction::LowerIsBetter),
        (Metric::Cpm, targets.cpm_benchmark, Direction::LowerIsBetter),
    ]
    .into_iter()
    .filter_map(|(metric, target, direction)| {
        let actual = efficiency.get(&metric)?.value()?;
        compare(metric, actual, target, direction)
    })
    .collect()
}

/// Compare one value against its target. Returns `None` when the normalised
/// ratio has a zero denominator (a zero cost metric, or a zero target).
pub(crate) fn compare(
    metric: Metric,
    actual: Decimal,
    target: Decimal,
    direction: Direction,
) -> Option<TargetComparison> {
    let ratio = match direction {
        Direction::HigherIsBetter => MetricValue::ratio(actual, target),
        Direction::LowerIsBetter => MetricValue::ratio(target, actual),
    };
    let Some(performance_ratio) = ratio.value() else {
        tracing::debug!(?metric, %actual, %target, "target comparison skipped");
        return None;
    };

    let status = match (actual.cmp(&target), direction) {
        (std::cmp::Ordering::Equal, _) => TargetStatus::At,
        (std::cmp::Ordering::Greater, Direction::HigherIsBetter)
        | (std::cmp::Ordering::Less, Direction::LowerIsBetter) => TargetStatus::Above,
        _ => TargetStatus::Below,
    };

    Some(TargetComparison {
        metric,
        actual,
        target,
        direction,
        performance_ratio,
        status,
        grade: Grade::from_ratio(performance_ratio),
    })
}

/// Completeness of revenue, visits, impressions and spot time, each worth a
/// quarter of the score.
fn data_quality_score(records: &[CampaignRecord]) -> Decimal {
    if records.is_empty() {
        return Decimal::ZERO;
    }
    let total = Decimal::from(records.len());
    let present = [
        records.iter().filter(|r| r.online_revenue.is_some()).count(),
        records.iter().filter(|r| r.online_visits.is_some()).count(),
        records.iter().filter(|r| r.impressions.is_some()).count(),
        // spot_time is non-nullable in the record type
        records.len(),
    ];
    let points = Decimal::from(QUALITY_POINTS_PER_FIELD);
    present
        .into_iter()
        .map(|count| Decimal::from(count) / total * points)
        .sum::<Decimal>()
        .round_dp(2)
        .min(Decimal::ONE_HUNDRED)
        .normalize()
}

fn executive_statements(totals: &Totals, comparisons: &[TargetComparison]) -> ExecutiveStatements {
    let overall_performance = comparisons
        .iter()
        .find(|c| c.metric == Metric::Roas)
        .map(|roas| match roas.grade {
            Grade::A | Grade::B => "Strong campaign performance exceeding targets".to_string(),
            Grade::C => "Solid campaign performance meeting expectations".to_string(),
            Grade::D | Grade::F => {
                "Campaign performance below expectations, optimization needed".to_string()
            }
        });

    let scale = if totals.spots >= LARGE_CAMPAIGN_SPOTS {
        "Large"
    } else if totals.spots >= MEDIUM_CAMPAIGN_SPOTS {
        "Medium"
    } else {
        "Small"
    };

    let attribution_quality = if totals.visits > 0 {
        "Strong attribution tracking with measurable online impact"
    } else {
        "Limited attribution data - consider measurement improvements"
    };

    ExecutiveStatements {
        overall_performance,
        campaign_scale: format!("{scale}-scale campaign with {} TV spots", totals.spots),
        attribution_quality: attribution_quality.to_string(),
    }
}

/// Sum that saturates at the `Decimal` bounds instead of panicking.
pub(crate) fn sum_decimal(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Sum that saturates at the `i64` bounds instead of overflowing.
pub(crate) fn sum_count(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0, i64::saturating_add)
}

/// Round a ratio for storage. Shared with the breakdown module.
pub(crate) fn round_ratio(value: Decimal) -> Decimal {
    value.round_dp(RATIO_DP).normalize()
}

#[cfg(test)]
#[path = "calculator_test.rs"]
mod tests;
