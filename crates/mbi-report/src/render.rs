//! Plain-text rendering shared by the console and the executive summary file.

use std::fmt::Write as _;
use std::io::Write;

use mbi_insights::InsightOrigin;
use mbi_kpi::format::{currency, grouped, metric_figure, metric_value};
use mbi_kpi::{BreakdownRow, Metric};
use rust_decimal::Decimal;

use crate::error::ReportError;
use crate::report::Report;

const RULE_WIDTH: usize = 70;
const TOP_ROWS: usize = 5;

fn rule(out: &mut String) {
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
}

fn numbered(out: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {item}", i + 1);
    }
    out.push('\n');
}

fn top_rows(out: &mut String, title: &str, rows: &[BreakdownRow]) {
    if rows.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for (i, row) in rows.iter().take(TOP_ROWS).enumerate() {
        let _ = writeln!(
            out,
            "   {}. {}: {} visits from {} spots ({} avg/spot, {} cost)",
            i + 1,
            row.name,
            grouped(row.stats.visits, 0),
            grouped(row.stats.spots, 0),
            grouped(row.stats.avg_visits_per_spot, 1),
            currency(row.stats.cost, 0),
        );
    }
    out.push('\n');
}

/// The human-readable report. The executive summary file holds exactly this
/// text.
#[must_use]
pub fn render_text(report: &Report) -> String {
    let kpis = report.kpis();
    let totals = &kpis.totals;
    let insights = report.insights();
    let mut out = String::new();

    rule(&mut out);
    let _ = writeln!(out, "EXECUTIVE SUMMARY - {}", report.client_label());
    rule(&mut out);
    out.push('\n');

    let period = report.dataset().date_range.map_or_else(
        || "N/A".to_string(),
        |r| {
            format!(
                "{} to {}",
                r.start.format("%Y-%m-%d"),
                r.end.format("%Y-%m-%d")
            )
        },
    );
    let _ = writeln!(
        out,
        "Analysis Period: {period} ({}-day lookback)",
        report.lookback_days()
    );
    let _ = writeln!(
        out,
        "Spots Analyzed: {} | Clients: {}",
        grouped(report.dataset().spots, 0),
        grouped(report.dataset().clients, 0)
    );
    let _ = writeln!(
        out,
        "Data Quality: {}%\n",
        grouped(kpis.data_quality_score, 0)
    );

    out.push_str("EXECUTIVE SUMMARY:\n");
    let _ = writeln!(out, "{}\n", insights.summary);
    numbered(&mut out, "KEY FINDINGS", &insights.key_findings);
    numbered(&mut out, "RECOMMENDATIONS", &insights.recommendations);

    out.push_str("CAMPAIGN METRICS:\n");
    let visits_per_spot = Decimal::from(totals.visits) / Decimal::from(totals.spots.max(1));
    let _ = writeln!(out, "   Spend: {}", currency(totals.spend, 2));
    let _ = writeln!(out, "   Revenue: {}", currency(totals.revenue, 2));
    let _ = writeln!(out, "   Impressions: {}", grouped(totals.impressions, 0));
    let _ = writeln!(out, "   Visits: {}", grouped(totals.visits, 0));
    let _ = writeln!(out, "   Orders: {}", grouped(totals.orders, 0));
    let _ = writeln!(out, "   Leads: {}", grouped(totals.leads, 0));
    let _ = writeln!(out, "   Visits per Spot: {}", grouped(visits_per_spot, 2));
    for metric in Metric::ALL {
        let _ = writeln!(
            out,
            "   {}: {}",
            metric.label(),
            metric_value(metric, kpis.metric(metric))
        );
    }
    out.push('\n');

    out.push_str("TARGET PERFORMANCE:\n");
    if kpis.comparisons.is_empty() {
        out.push_str("   No metric could be compared against its target\n");
    }
    for c in &kpis.comparisons {
        let _ = writeln!(
            out,
            "   {}: {} vs {} target - {} (grade {})",
            c.metric.label(),
            metric_figure(c.metric, c.actual),
            metric_figure(c.metric, c.target),
            c.status,
            c.grade
        );
    }
    out.push('\n');

    out.push_str("CAMPAIGN ASSESSMENT:\n");
    for line in kpis.statements.lines() {
        let _ = writeln!(out, "   - {line}");
    }
    out.push('\n');

    top_rows(&mut out, "TOP STATIONS", &kpis.breakdowns.by_station);
    top_rows(&mut out, "TOP DAYPARTS", &kpis.breakdowns.by_daypart);
    top_rows(&mut out, "TOP MARKETS", &kpis.breakdowns.by_market);

    let source = match &insights.origin {
        InsightOrigin::Generated { model } => format!("AI insights by {model}"),
        InsightOrigin::Unavailable { .. } => "AI insights unavailable".to_string(),
    };
    let _ = writeln!(
        out,
        "Generated: {} | {source}",
        report.generated_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}

/// Write [`render_text`] to `out` and flush it.
///
/// # Errors
///
/// Returns [`ReportError::Console`] if the writer fails (for example a closed
/// pipe).
pub fn write_report<W: Write>(report: &Report, out: &mut W) -> Result<(), ReportError> {
    out.write_all(render_text(report).as_bytes())
        .and_then(|()| out.flush())
        .map_err(ReportError::Console)
}

/// Write [`render_text`] to stdout.
///
/// # Errors
///
/// Same as [`write_report`].
pub fn render_console(report: &Report) -> Result<(), ReportError> {
    write_report(report, &mut std::io::stdout().lock())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mbi_core::{CampaignDataset, CampaignRecord, ClientScope, KpiTargets};
    use mbi_insights::InsightReport;

    use super::*;
    use crate::report::build_at;

    fn record(key: &str, cost: i64, revenue: i64, orders: i64) -> CampaignRecord {
        CampaignRecord {
            unique_key: key.to_string(),
            client: "BARK".to_string(),
            product: None,
            market: Some("NATIONAL".to_string()),
            station: Some("ESPN".to_string()),
            daypart: Some("PRIME".to_string()),
            spot_time: Utc.with_ymd_and_hms(2025, 6, 1, 20, 0, 0).unwrap(),
            spot_cost: Some(Decimal::from(cost)),
            online_revenue: Some(Decimal::from(revenue)),
            online_visits: Some(10),
            online_orders: Some(orders),
            online_leads: None,
            impressions: Some(1_000),
        }
    }

    fn report(insights: &InsightReport) -> Report {
        let dataset = CampaignDataset::new(
            ClientScope::parse("bark"),
            30,
            vec![
                record("a", 10, 15, 1),
                record("b", 20, 60, 2),
                record("c", 30, 0, 0),
            ],
        );
        let kpis = mbi_kpi::compute(&dataset, &KpiTargets::default());
        build_at(
            &dataset,
            &kpis,
            insights,
            Utc.with_ymd_and_hms(2025, 6, 4, 9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn text_covers_header_metrics_and_targets() {
        let text = render_text(&report(&InsightReport::unavailable("timeout")));

        assert!(text.contains("EXECUTIVE SUMMARY - BARK\n"));
        assert!(text.contains("Analysis Period: 2025-06-01 to 2025-06-01 (30-day lookback)"));
        assert!(text.contains("Spots Analyzed: 3 | Clients: 1"));
        assert!(text.contains("AI insights unavailable: timeout"));
        assert!(text.contains("   Spend: $60.00\n"));
        assert!(text.contains("   ROAS: 1.25x\n"));
        assert!(text.contains("   CPO: $20.00\n"));
        assert!(text.contains("   Cost per Lead: N/A\n"));
        assert!(text.contains("   ROAS: 1.25x vs 3.50x target - below target (grade F)"));
        assert!(text.contains("   1. ESPN: 30 visits from 3 spots (10.0 avg/spot, $60 cost)"));
        assert!(text.ends_with("Generated: 2025-06-04 09:30:00 UTC | AI insights unavailable\n"));
        assert!(!text.contains("KEY FINDINGS:"));
    }

    #[test]
    fn findings_and_recommendations_are_numbered() {
        let insights = InsightReport {
            summary: "Solid.".to_string(),
            key_findings: vec!["ESPN leads".to_string(), "LATE lags".to_string()],
            recommendations: vec!["Shift to PRIME".to_string()],
            raw_text: None,
            origin: InsightOrigin::Generated {
                model: "gemini-2.0-flash".to_string(),
            },
        };
        let text = render_text(&report(&insights));

        assert!(text.contains("KEY FINDINGS:\n1. ESPN leads\n2. LATE lags\n"));
        assert!(text.contains("RECOMMENDATIONS:\n1. Shift to PRIME\n"));
        assert!(text.contains("| AI insights by gemini-2.0-flash"));
    }

    #[test]
    fn write_report_emits_rendered_text() {
        let report = report(&InsightReport::unavailable("timeout"));
        let mut out: Vec<u8> = Vec::new();

        write_report(&report, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), render_text(&report));
    }
}
