//! Renders the data summary and KPI values that fill the prompt template.

use std::fmt::Write as _;

use mbi_core::{PromptTemplate, PromptValues};
use mbi_kpi::format::{currency, grouped, metric_figure, metric_value};
use mbi_kpi::{DailyTrend, KpiSet, Metric};
use rust_decimal::Decimal;

const STATION_ROWS: usize = 10;
const STATION_NAME_WIDTH: usize = 11;
const DAYPART_NAME_WIDTH: usize = 8;

/// Daily entries needed before week-over-week trends are reported.
pub const MIN_TREND_DAYS: usize = 14;
const WEEK: usize = 7;

/// Week-over-week movement beyond this percentage counts as a trend.
const TREND_THRESHOLD_PCT: i64 = 5;

/// Fill `template` with the summary and KPI text for `kpis`.
#[must_use]
pub fn build_prompt(template: &PromptTemplate, kpis: &KpiSet, client_label: &str) -> String {
    let data_summary = data_summary(kpis);
    let kpi_values = kpi_values(kpis);
    template.render(&PromptValues {
        client_label,
        data_summary: &data_summary,
        kpi_values: &kpi_values,
    })
}

/// Campaign overview, station and daypart tables, and weekly trends.
#[must_use]
pub fn data_summary(kpis: &KpiSet) -> String {
    [
        overview(kpis),
        station_table(kpis),
        daypart_table(kpis),
        weekly_trends(&kpis.daily_trends),
    ]
    .join("\n\n")
}

fn overview(kpis: &KpiSet) -> String {
    let totals = &kpis.totals;
    let (start, end) = kpis.date_range.map_or_else(
        || ("Unknown".to_string(), "Unknown".to_string()),
        |r| {
            (
                r.start.format("%Y-%m-%d").to_string(),
                r.end.format("%Y-%m-%d").to_string(),
            )
        },
    );
    let visits_per_spot =
        Decimal::from(totals.visits) / Decimal::from(totals.spots.max(1));

    let mut out = format!(
        "Period: {start} to {end}\n\
         Total Spots: {} | Visits: {} | Efficiency: {} visits/spot\n\
         Investment: {}",
        grouped(totals.spots, 0),
        grouped(totals.visits, 0),
        grouped(visits_per_spot, 2),
        currency(totals.spend, 0),
    );
    if totals.revenue > Decimal::ZERO {
        let _ = write!(
            out,
            " | Revenue: {} | ROAS: {}",
            currency(totals.revenue, 0),
            metric_value(Metric::Roas, kpis.metric(Metric::Roas)),
        );
    }
    out
}

fn fit(name: &str, width: usize) -> String {
    let clipped: String = name.chars().take(width).collect();
    format!("{clipped:<width$}")
}

fn station_table(kpis: &KpiSet) -> String {
    let stations = &kpis.breakdowns.by_station;
    if stations.is_empty() {
        return "STATION PERFORMANCE: No data available".to_string();
    }

    let mut out = String::from(
        "STATION PERFORMANCE:\n\
         Station     | Visits | Spots | Efficiency | Cost      | Ranking\n\
         ------------|--------|-------|------------|-----------|--------",
    );
    for (rank, row) in stations.iter().take(STATION_ROWS).enumerate() {
        let ranking = match rank {
            0..=2 => "Top",
            3..=5 => "Good",
            _ => "Weak",
        };
        let _ = write!(
            out,
            "\n{} | {:>6} | {:>5} | {:>10} | {:>9} | {ranking}",
            fit(&row.name, STATION_NAME_WIDTH),
            grouped(row.stats.visits, 0),
            row.stats.spots,
            grouped(row.stats.avg_visits_per_spot, 1),
            currency(row.stats.cost, 0),
        );
    }
    out
}

fn daypart_priority(avg_visits: Decimal) -> &'static str {
    if avg_visits >= Decimal::from(30) {
        "High"
    } else if avg_visits >= Decimal::from(15) {
        "Medium"
    } else {
        "Low"
    }
}

fn daypart_table(kpis: &KpiSet) -> String {
    let dayparts = &kpis.breakdowns.by_daypart;
    if dayparts.is_empty() {
        return "DAYPART PERFORMANCE: No data available".to_string();
    }

    let mut out = String::from(
        "DAYPART PERFORMANCE:\n\
         Daypart  | Visits | Spots | Efficiency | Cost      | Priority\n\
         ---------|--------|-------|------------|-----------|---------",
    );
    for row in dayparts {
        let _ = write!(
            out,
            "\n{} | {:>6} | {:>5} | {:>10} | {:>9} | {}",
            fit(&row.name, DAYPART_NAME_WIDTH),
            grouped(row.stats.visits, 0),
            row.stats.spots,
            grouped(row.stats.avg_visits_per_spot, 1),
            currency(row.stats.cost, 0),
            daypart_priority(row.stats.avg_visits_per_spot),
        );
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Improving,
    Stable,
    Declining,
}

impl TrendDirection {
    fn label(self) -> &'static str {
        match self {
            TrendDirection::Improving => "Improving",
            TrendDirection::Stable => "Stable",
            TrendDirection::Declining => "Declining",
        }
    }
}

/// Visits per spot for the last seven daily entries against the seven before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyTrend {
    pub recent_efficiency: Decimal,
    pub previous_efficiency: Decimal,
    pub change_pct: Decimal,
    pub direction: TrendDirection,
}

fn week_efficiency(days: &[DailyTrend]) -> Decimal {
    let visits: i64 = days.iter().map(|d| d.visits).sum();
    let spots: usize = days.iter().map(|d| d.spots).sum();
    Decimal::from(visits) / Decimal::from(spots.max(1))
}

/// `None` when fewer than [`MIN_TREND_DAYS`] daily entries are available.
#[must_use]
pub fn weekly_trend(daily: &[DailyTrend]) -> Option<WeeklyTrend> {
    if daily.len() < MIN_TREND_DAYS {
        return None;
    }
    let recent = &daily[daily.len() - WEEK..];
    let previous = &daily[daily.len() - 2 * WEEK..daily.len() - WEEK];

    let recent_efficiency = week_efficiency(recent);
    let previous_efficiency = week_efficiency(previous);
    let change_pct = (recent_efficiency - previous_efficiency)
        / previous_efficiency.max(Decimal::ONE)
        * Decimal::ONE_HUNDRED;

    let threshold = Decimal::from(TREND_THRESHOLD_PCT);
    let direction = if change_pct > threshold {
        TrendDirection::Improving
    } else if change_pct < -threshold {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    Some(WeeklyTrend {
        recent_efficiency,
        previous_efficiency,
        change_pct,
        direction,
    })
}

fn weekly_trends(daily: &[DailyTrend]) -> String {
    let Some(trend) = weekly_trend(daily) else {
        return "WEEKLY TRENDS: Insufficient data for trend analysis".to_string();
    };
    let sign = if trend.change_pct.is_sign_negative() { "" } else { "+" };
    format!(
        "WEEKLY TRENDS:\n\
         Recent Week Efficiency: {} visits/spot\n\
         Previous Week Efficiency: {} visits/spot\n\
         Week-over-Week Change: {sign}{}%\n\
         Trend Direction: {}",
        grouped(trend.recent_efficiency, 1),
        grouped(trend.previous_efficiency, 1),
        grouped(trend.change_pct, 1),
        trend.direction.label(),
    )
}

/// Every efficiency metric followed by every target comparison.
#[must_use]
pub fn kpi_values(kpis: &KpiSet) -> String {
    let mut out = String::from("Efficiency:");
    for metric in Metric::ALL {
        let _ = write!(
            out,
            "\n- {}: {}",
            metric.label(),
            metric_value(metric, kpis.metric(metric))
        );
    }

    out.push_str("\nTarget Comparison:");
    if kpis.comparisons.is_empty() {
        out.push_str("\n- No metric could be compared against its target");
    }
    for c in &kpis.comparisons {
        let _ = write!(
            out,
            "\n- {}: {} vs target {} ({}, grade {})",
            c.metric.label(),
            metric_figure(c.metric, c.actual),
            metric_figure(c.metric, c.target),
            c.status,
            c.grade,
        );
    }

    let _ = write!(
        out,
        "\nData Quality Score: {}/100",
        grouped(kpis.data_quality_score, 1)
    );
    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};
    use mbi_core::{CampaignDataset, CampaignRecord, ClientScope, KpiTargets};

    use super::*;

    fn record(key: &str, station: &str, daypart: &str, day: i64, visits: i64) -> CampaignRecord {
        CampaignRecord {
            unique_key: key.to_string(),
            client: "BARK".to_string(),
            product: None,
            market: Some("NATIONAL".to_string()),
            station: Some(station.to_string()),
            daypart: Some(daypart.to_string()),
            spot_time: Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap() + Duration::days(day),
            spot_cost: Some(Decimal::from(1_500)),
            online_revenue: Some(Decimal::from(2_000)),
            online_visits: Some(visits),
            online_orders: Some(2),
            online_leads: None,
            impressions: Some(100_000),
        }
    }

    fn kpis(records: Vec<CampaignRecord>) -> KpiSet {
        let data = CampaignDataset::new(ClientScope::parse("bark"), 30, records);
        mbi_kpi::compute(&data, &KpiTargets::default())
    }

    fn day(offset: i64, spots: usize, visits: i64) -> DailyTrend {
        DailyTrend {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() + Duration::days(offset),
            spots,
            revenue: Decimal::ZERO,
            visits,
        }
    }

    #[test]
    fn overview_reports_totals_and_roas() {
        let summary = data_summary(&kpis(vec![
            record("a", "ESPN", "PRIME", 0, 10),
            record("b", "CNN", "LATE", 1, 20),
        ]));
        assert!(summary.starts_with("Period: 2025-06-01 to 2025-06-02"));
        assert!(summary.contains("Total Spots: 2 | Visits: 30 | Efficiency: 15.00 visits/spot"));
        assert!(summary.contains("Investment: $3,000 | Revenue: $4,000 | ROAS: 1.33x"));
    }

    #[test]
    fn station_table_ranks_and_clips_names() {
        let summary = data_summary(&kpis(vec![
            record("a", "DISCOVERY CHANNEL", "PRIME", 0, 40),
            record("b", "CNN", "PRIME", 0, 5),
        ]));
        assert!(summary.contains("\nDISCOVERY C |     40 |     1 |       40.0 |    $1,500 | Top"));
        assert!(summary.contains("\nDAYPART PERFORMANCE:"));
        assert!(summary.contains("PRIME    |     45 |     2 |       22.5 |    $3,000 | Medium"));
    }

    #[test]
    fn empty_breakdowns_say_no_data() {
        let summary = data_summary(&kpis(Vec::new()));
        assert!(summary.contains("Period: Unknown to Unknown"));
        assert!(summary.contains("STATION PERFORMANCE: No data available"));
        assert!(summary.contains("WEEKLY TRENDS: Insufficient data for trend analysis"));
        assert!(!summary.contains("Revenue:"));
    }

    #[test]
    fn weekly_trend_needs_fourteen_days() {
        let daily: Vec<DailyTrend> = (0..13).map(|i| day(i, 1, 10)).collect();
        assert!(weekly_trend(&daily).is_none());
    }

    #[test]
    fn weekly_trend_compares_last_two_weeks() {
        let mut daily: Vec<DailyTrend> = (0..7).map(|i| day(i, 2, 20)).collect();
        daily.extend((7..14).map(|i| day(i, 2, 24)));

        let trend = weekly_trend(&daily).unwrap();
        assert_eq!(trend.previous_efficiency, Decimal::from(10));
        assert_eq!(trend.recent_efficiency, Decimal::from(12));
        assert_eq!(trend.change_pct, Decimal::from(20));
        assert_eq!(trend.direction, TrendDirection::Improving);
    }

    #[test]
    fn small_weekly_movement_is_stable() {
        let mut daily: Vec<DailyTrend> = (0..7).map(|i| day(i, 1, 100)).collect();
        daily.extend((7..14).map(|i| day(i, 1, 97)));
        assert_eq!(
            weekly_trend(&daily).unwrap().direction,
            TrendDirection::Stable
        );

        let text = weekly_trends(&daily);
        assert!(text.contains("Week-over-Week Change: -3.0%"), "{text}");
    }

    #[test]
    fn kpi_values_list_metrics_and_comparisons() {
        let text = kpi_values(&kpis(vec![record("a", "ESPN", "PRIME", 0, 10)]));
        assert!(text.contains("- ROAS: 1.33x"));
        assert!(text.contains("- Cost per Lead: N/A"));
        assert!(text.contains("- ROAS: 1.33x vs target 3.50x (below target, grade F)"));
        assert!(text.contains("Data Quality Score: 100.0/100"));
    }

    #[test]
    fn build_prompt_fills_template() {
        let template = PromptTemplate::parse("{client_label}|{kpi_values}").unwrap();
        let prompt = build_prompt(
            &template,
            &kpis(vec![record("a", "ESPN", "PRIME", 0, 10)]),
            "BARK",
        );
        assert!(prompt.starts_with("BARK|Efficiency:"));
    }
}
